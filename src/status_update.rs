use std::fmt;
use thiserror::Error;

use crate::db::OrderStore;
use crate::order::{self, OrderId, OrderStatus, UserRole};

/// A status change the store has confirmed
///
/// Only `update_order_status` hands these out, so anything holding one
/// may update its cached copy of the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// Could not find the specified order
    #[error("Could not find order {0}")]
    OrderNotFound(OrderId),

    /// The caller's role may not do this
    #[error("You don't have permission to update status from {from} to {to}")]
    NotPermitted { from: OrderStatus, to: OrderStatus },

    /// Store is unreachable or rejected the write, status is unchanged
    #[error("Failed to update order status: {0}")]
    Store(String),
}

impl UpdateError {
    /// Worth trying again later
    pub const fn is_retryable(&self) -> bool {
        matches!(self, UpdateError::Store(_))
    }
}

/// What the orders screen offers for one order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusOptions {
    pub order_id: OrderId,
    pub current: OrderStatus,
    pub available: Vec<OrderStatus>,
}

/// Reads the order's current status and lists what `role` may do with it
pub async fn status_options<S: OrderStore>(
    store: &mut S,
    role: UserRole,
    oid: OrderId,
) -> Result<StatusOptions, UpdateError> {
    let current = read_status(store, oid).await?;
    Ok(StatusOptions {
        order_id: oid,
        current,
        available: order::available_transitions(role, current),
    })
}

/// Moves the order to `requested` if `role` is allowed to
///
/// The current status is always read fresh from the store, nothing
/// cached by the caller is trusted.
pub async fn update_order_status<S: OrderStore>(
    store: &mut S,
    role: UserRole,
    oid: OrderId,
    requested: OrderStatus,
) -> Result<StatusChanged, UpdateError> {
    log::info!("update_order_status {oid} to {requested:?} as {role}");
    let current = read_status(store, oid).await?;

    if !order::can_transition(role, current, requested) {
        log::info!("update_order_status {oid}: {role} may not \
go {current:?} => {requested:?}");
        return Err(UpdateError::NotPermitted { from: current, to: requested })
    }

    match store.write_order_status(oid, requested).await {
        Ok(true) => {
            log::info!("update_order_status {oid}: {current:?} => {requested:?}");
            Ok(StatusChanged { order_id: oid, from: current, to: requested })
        },
        // Deleted between the read and the write
        Ok(false) => Err(UpdateError::OrderNotFound(oid)),
        Err(e) => {
            log::warn!("update_order_status {oid}: write failed: {e:?}");
            Err(UpdateError::Store(e.to_string()))
        }
    }
}

async fn read_status<S: OrderStore>(
    store: &mut S,
    oid: OrderId,
) -> Result<OrderStatus, UpdateError> {
    match store.read_order_status(oid).await {
        Ok(Some(status)) => Ok(status),
        Ok(None) => Err(UpdateError::OrderNotFound(oid)),
        Err(e) => {
            log::warn!("read_status {oid}: {e:?}");
            Err(UpdateError::Store(e.to_string()))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

/// Message shown to the user after they tried to do something
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, title: &str, message: impl Into<String>) -> Notice {
        Notice { kind, title: title.to_string(), message: message.into() }
    }

    pub fn for_update(res: &Result<StatusChanged, UpdateError>) -> Notice {
        match res {
            Ok(change) => Notice::new(
                NoticeKind::Success, "Success",
                format!("Order status updated to {}", change.to.display_name())),
            Err(e @ UpdateError::NotPermitted { .. }) => Notice::new(
                NoticeKind::Info, "Permission Denied", e.to_string()),
            Err(UpdateError::OrderNotFound(_)) => Notice::new(
                NoticeKind::Error, "Error",
                "Could not find this order. It may have been removed."),
            Err(UpdateError::Store(_)) => Notice::new(
                NoticeKind::Error, "Error", "Failed to update order status"),
        }
    }

    /// Shown instead of the picker when there is nothing to choose from
    pub fn for_options(options: &StatusOptions) -> Option<Notice> {
        if !options.available.is_empty() {
            return None
        }
        Some(Notice::new(
            NoticeKind::Info, "No Updates Available",
            "No status updates are available for this order"))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{mem, Unreachable};
    use crate::order::{Order, UserId};

    async fn mk_db_with_order() -> (mem::Db, OrderId) {
        let mut db = mem::Db::new().await.unwrap();
        let oid = db.add_order(&mut Order::new(UserId(1), "NC-1", 2_000))
            .await.unwrap();
        (db, oid)
    }

    #[tokio::test]
    async fn test_operator_drives_full_lifecycle() {
        let (mut db, oid) = mk_db_with_order().await;
        let steps = [OrderStatus::Confirm, OrderStatus::InProcess,
                     OrderStatus::Ready, OrderStatus::Completed];
        let mut prev = OrderStatus::Pending;
        for next in steps {
            let change = update_order_status(&mut db, UserRole::Operator, oid, next)
                .await.unwrap();
            assert_eq!(StatusChanged { order_id: oid, from: prev, to: next }, change);
            prev = next;
        }
        let options = status_options(&mut db, UserRole::Operator, oid).await.unwrap();
        assert_eq!(OrderStatus::Completed, options.current);
        assert!(options.available.is_empty());
        assert!(Notice::for_options(&options).is_some());
    }

    #[tokio::test]
    async fn test_denied_request_leaves_status_alone() {
        let (mut db, oid) = mk_db_with_order().await;

        let res = update_order_status(&mut db, UserRole::Seller, oid,
                                      OrderStatus::Confirm).await;
        assert_eq!(Err(UpdateError::NotPermitted {
            from: OrderStatus::Pending, to: OrderStatus::Confirm }), res);

        let res = update_order_status(&mut db, UserRole::Operator, oid,
                                      OrderStatus::Ready).await;
        assert!(matches!(res, Err(UpdateError::NotPermitted { .. })));

        assert_eq!(Some(OrderStatus::Pending), db.read_order_status(oid).await.unwrap());
    }

    #[tokio::test]
    async fn test_seller_completes_ready_order() {
        let (mut db, oid) = mk_db_with_order().await;
        db.write_order_status(oid, OrderStatus::Ready).await.unwrap();

        let options = status_options(&mut db, UserRole::Seller, oid).await.unwrap();
        assert_eq!(vec![OrderStatus::Completed], options.available);
        assert_eq!(None, Notice::for_options(&options));

        let res = update_order_status(&mut db, UserRole::Seller, oid,
                                      OrderStatus::Completed).await;
        assert!(res.is_ok());
        assert_eq!(Some(OrderStatus::Completed), db.read_order_status(oid).await.unwrap());
    }

    #[tokio::test]
    async fn test_uses_store_status_not_callers() {
        let (mut db, oid) = mk_db_with_order().await;
        // someone else already moved it forward
        db.write_order_status(oid, OrderStatus::Confirm).await.unwrap();

        let res = update_order_status(&mut db, UserRole::Operator, oid,
                                      OrderStatus::Confirm).await;
        assert_eq!(Err(UpdateError::NotPermitted {
            from: OrderStatus::Confirm, to: OrderStatus::Confirm }), res);
    }

    #[tokio::test]
    async fn test_missing_order() {
        let (mut db, _) = mk_db_with_order().await;
        let res = update_order_status(&mut db, UserRole::Operator, OrderId(77),
                                      OrderStatus::Confirm).await;
        assert_eq!(Err(UpdateError::OrderNotFound(OrderId(77))), res);
        assert_eq!(Err(UpdateError::OrderNotFound(OrderId(77))),
                   status_options(&mut db, UserRole::Operator, OrderId(77)).await);
    }

    #[tokio::test]
    async fn test_store_failure_is_retryable() {
        let res = update_order_status(&mut Unreachable, UserRole::Operator,
                                      OrderId(1), OrderStatus::Confirm).await;
        let err = res.clone().unwrap_err();
        assert!(err.is_retryable());

        let notice = Notice::for_update(&res);
        assert_eq!(NoticeKind::Error, notice.kind);
        assert_eq!("Failed to update order status", notice.message);
    }

    #[tokio::test]
    async fn test_cached_order_follows_confirmed_change_only() {
        let (mut db, oid) = mk_db_with_order().await;
        let mut cached = db.get_order(oid).await.unwrap().unwrap();

        let res = update_order_status(&mut db, UserRole::Seller, oid,
                                      OrderStatus::Confirm).await;
        if let Ok(change) = &res {
            cached.apply_status_change(change);
        }
        assert_eq!(OrderStatus::Pending, cached.status);

        let change = update_order_status(&mut db, UserRole::Operator, oid,
                                         OrderStatus::Confirm).await.unwrap();
        assert!(cached.apply_status_change(&change));
        assert_eq!(OrderStatus::Confirm, cached.status);
    }

    #[test]
    fn test_notice_texts() {
        let ok = Ok(StatusChanged {
            order_id: OrderId(1),
            from: OrderStatus::Confirm,
            to: OrderStatus::InProcess,
        });
        assert_eq!("Success: Order status updated to In Process",
                   Notice::for_update(&ok).to_string());

        let denied = Err(UpdateError::NotPermitted {
            from: OrderStatus::Pending, to: OrderStatus::Confirm });
        let notice = Notice::for_update(&denied);
        assert_eq!("Permission Denied", notice.title);
        assert_eq!("You don't have permission to update status \
from Pending to Confirmed", notice.message);
    }
}
