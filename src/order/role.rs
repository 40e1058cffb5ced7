use std::fmt;
use serde::{Serialize, Deserialize};
use crate::order::OrderStatus;

/// Capability class of the signed in user
///
/// Sellers place and receive orders, operators fulfill them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Seller,
    Operator,
}

/// What a role may do with an order's status
pub struct RolePermissions {
    /// Decides a single `current -> next` request
    pub can_update_status: fn(OrderStatus, OrderStatus) -> bool,

    /// Every status this role can ever move an order into
    pub allowed_statuses: &'static [OrderStatus],
}

static SELLER: RolePermissions = RolePermissions {
    can_update_status: seller_can_update,
    allowed_statuses: &[OrderStatus::Completed],
};

static OPERATOR: RolePermissions = RolePermissions {
    can_update_status: operator_can_update,
    allowed_statuses: &[OrderStatus::Confirm,
                        OrderStatus::InProcess,
                        OrderStatus::Ready,
                        OrderStatus::Completed],
};

/// Sellers only get to close an order that is ready for pickup
fn seller_can_update(current: OrderStatus, next: OrderStatus) -> bool {
    current == OrderStatus::Ready && next == OrderStatus::Completed
}

fn operator_can_update(current: OrderStatus, next: OrderStatus) -> bool {
    current.next_statuses().contains(&next)
}

impl UserRole {
    pub const ALL: &'static [UserRole] =
        &[ UserRole::Seller, UserRole::Operator ];

    pub fn permissions(self) -> &'static RolePermissions {
        match self {
            UserRole::Seller   => &SELLER,
            UserRole::Operator => &OPERATOR,
        }
    }

    /// Only operators may change quantities of order lines
    pub const fn can_edit_items(self) -> bool {
        matches!(self, UserRole::Operator)
    }

    pub const fn id(self) -> &'static str {
        match self {
            UserRole::Seller   => "seller",
            UserRole::Operator => "operator",
        }
    }

    /// Returns None for anything that isn't exactly a role id
    pub fn from_id(id: &str) -> Option<UserRole> {
        UserRole::ALL.iter().cloned().find(|r| r.id() == id)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// May `role` move an order from `current` to `next`?
pub fn can_transition(
    role: UserRole,
    current: OrderStatus,
    next: OrderStatus,
) -> bool {
    (role.permissions().can_update_status)(current, next)
}

/// Statuses `role` may move an order at `current` into
///
/// Always exactly the statuses for which `can_transition` is true.
pub fn available_transitions(
    role: UserRole,
    current: OrderStatus,
) -> Vec<OrderStatus> {
    role.permissions().allowed_statuses.iter()
        .cloned()
        .filter(|next| can_transition(role, current, *next))
        .collect()
}

/// Same as `can_transition` but for raw ids, anything unknown is denied
pub fn can_transition_by_id(role: &str, current: &str, next: &str) -> bool {
    match (UserRole::from_id(role),
           OrderStatus::from_id(current),
           OrderStatus::from_id(next)) {
        (Some(role), Some(current), Some(next)) =>
            can_transition(role, current, next),
        _ => {
            log::debug!("denying transition for unknown input \
{role:?} {current:?} -> {next:?}");
            false
        }
    }
}

/// Same as `available_transitions` but for raw ids, anything unknown
/// gets no transitions
pub fn available_transitions_by_id(role: &str, current: &str) -> Vec<OrderStatus> {
    match (UserRole::from_id(role), OrderStatus::from_id(current)) {
        (Some(role), Some(current)) => available_transitions(role, current),
        _ => Vec::new(),
    }
}
