use std::fmt;

mod status;
mod role;
mod item_error;
pub use status::OrderStatus;
pub use role::{UserRole, RolePermissions,
               can_transition, available_transitions,
               can_transition_by_id, available_transitions_by_id};
pub use item_error::ItemError;
use crate::{DateTime, Offset};
use crate::status_update::StatusChanged;
use serde::{Serialize, Deserialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
         Serialize, Deserialize)]
#[repr(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
         Serialize, Deserialize)]
#[repr(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
         Serialize, Deserialize)]
#[repr(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
}

impl ShippingInfo {
    /// Fills missing or blank fields with the checkout placeholders
    pub fn or_placeholders(
        full_name: Option<String>,
        address: Option<String>,
        city: Option<String>,
        phone: Option<String>,
    ) -> ShippingInfo {
        fn or(v: Option<String>, placeholder: &str) -> String {
            v.filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| placeholder.to_string())
        }
        ShippingInfo {
            full_name: or(full_name, "Customer"),
            address: or(address, "NA"),
            city: or(city, "NA"),
            phone: or(phone, "NA"),
        }
    }
}

/// `price_cents * quantity`, None if it doesn't fit
pub fn line_total(price_cents: u64, quantity: u32) -> Option<u64> {
    price_cents.checked_mul(quantity as u64)
}

/// One line of an order, product data is copied at checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: ItemId,
    pub product_id: u64,
    pub product_name: String,
    pub product_price_cents: u64,
    pub quantity: u32,
    pub total_price_cents: u64,
}

impl OrderItem {
    pub fn new(
        id: ItemId,
        product_id: u64,
        product_name: impl Into<String>,
        product_price_cents: u64,
        quantity: u32,
    ) -> Result<OrderItem, ItemError> {
        let total_price_cents = line_total(product_price_cents, quantity)
            .ok_or(ItemError::TotalOverflow(id))?;
        Ok(OrderItem {
            id,
            product_id,
            product_name: product_name.into(),
            product_price_cents,
            quantity,
            total_price_cents,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    /// Id of this order, None if not persisted in the store
    pub id: Option<OrderId>,

    /// Human facing number printed on receipts
    pub order_number: String,

    /// Who placed this order
    pub customer: UserId,

    pub status: OrderStatus,

    /// What the customer was charged at checkout
    pub final_amount_cents: u64,

    pub shipping: Option<ShippingInfo>,

    pub items: Vec<OrderItem>,

    pub created_at: DateTime,
}

impl Order {
    /// A freshly placed order, always `Pending`
    pub fn new(
        customer: UserId,
        order_number: impl Into<String>,
        final_amount_cents: u64,
    ) -> Order {
        Order {
            id: None,
            order_number: order_number.into(),
            customer,
            status: OrderStatus::Pending,
            final_amount_cents,
            shipping: None,
            items: Vec::new(),
            created_at: Offset::now(),
        }
    }

    /// Statuses `role` may move this order into right now
    pub fn available_transitions(&self, role: UserRole) -> Vec<OrderStatus> {
        available_transitions(role, self.status)
    }

    /// Applies a change the store already confirmed
    ///
    /// Returns false if `change` is about a different order.
    pub fn apply_status_change(&mut self, change: &StatusChanged) -> bool {
        if self.id != Some(change.order_id) {
            return false
        }
        self.status = change.to;
        true
    }

    /// Changes quantity of one line by `delta` and recomputes its total
    ///
    /// `final_amount_cents` is left as charged at checkout.
    pub fn adjust_item_quantity(
        &mut self,
        role: UserRole,
        item_id: ItemId,
        delta: i64,
    ) -> Result<&OrderItem, ItemError> {
        if !role.can_edit_items() {
            return Err(ItemError::NotPermitted)
        }

        let item = self.items.iter_mut()
            .find(|it| it.id == item_id)
            .ok_or(ItemError::ItemNotFound(item_id))?;

        let new_qty = item.quantity as i64 + delta;
        if new_qty < 1 || new_qty > u32::MAX as i64 {
            return Err(ItemError::InvalidQuantity(new_qty))
        }
        let total = line_total(item.product_price_cents, new_qty as u32)
            .ok_or(ItemError::TotalOverflow(item_id))?;
        item.quantity = new_qty as u32;
        item.total_price_cents = total;
        Ok(&*item)
    }
}

/// The two tabs of the orders screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderTab {
    /// Orders still moving through the workflow
    Active,
    /// Completed and cancelled orders
    History,
}

impl OrderTab {
    pub const fn shows(self, status: OrderStatus) -> bool {
        match self {
            OrderTab::Active  => !status.is_terminal(),
            OrderTab::History => status.is_terminal(),
        }
    }

    pub fn filter<'a>(self, orders: &'a [Order]) -> Vec<&'a Order> {
        orders.iter().filter(|o| self.shows(o.status)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_order() -> Order {
        let mut order = Order::new(UserId(1), "NC-0001", 4_500);
        order.id = Some(OrderId(7));
        order.items.push(OrderItem::new(ItemId(1), 10, "Chamomile tea", 1_500, 2).unwrap());
        order.items.push(OrderItem::new(ItemId(2), 11, "Honey", 1_500, 1).unwrap());
        order
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = Order::new(UserId(3), "NC-0002", 0);
        assert_eq!(OrderStatus::Pending, order.status);
        assert_eq!(None, order.id);
        assert_eq!(vec![OrderStatus::Confirm],
                   order.available_transitions(UserRole::Operator));
        assert!(order.available_transitions(UserRole::Seller).is_empty());
    }

    #[test]
    fn test_apply_status_change() {
        let mut order = mk_order();
        let change = StatusChanged {
            order_id: OrderId(7),
            from: OrderStatus::Pending,
            to: OrderStatus::Confirm,
        };
        assert!(order.apply_status_change(&change));
        assert_eq!(OrderStatus::Confirm, order.status);

        let other = StatusChanged { order_id: OrderId(8), ..change };
        let mut order = mk_order();
        assert!(!order.apply_status_change(&other));
        assert_eq!(OrderStatus::Pending, order.status);
    }

    #[test]
    fn test_operator_adjusts_quantity() {
        let mut order = mk_order();
        let item = order.adjust_item_quantity(
            UserRole::Operator, ItemId(1), 1).unwrap();
        assert_eq!(3, item.quantity);
        assert_eq!(4_500, item.total_price_cents);

        let item = order.adjust_item_quantity(
            UserRole::Operator, ItemId(1), -2).unwrap();
        assert_eq!(1, item.quantity);
        assert_eq!(1_500, item.total_price_cents);
        assert_eq!(4_500, order.final_amount_cents);
    }

    #[test]
    fn test_quantity_edit_rules() {
        let mut order = mk_order();
        assert_eq!(Err(ItemError::NotPermitted),
                   order.adjust_item_quantity(UserRole::Seller, ItemId(1), 1)
                   .map(|_| ()));
        assert_eq!(Err(ItemError::InvalidQuantity(0)),
                   order.adjust_item_quantity(UserRole::Operator, ItemId(2), -1)
                   .map(|_| ()));
        assert_eq!(Err(ItemError::ItemNotFound(ItemId(99))),
                   order.adjust_item_quantity(UserRole::Operator, ItemId(99), 1)
                   .map(|_| ()));
        assert_eq!(1, order.items[1].quantity);
    }

    #[test]
    fn test_line_total_overflow() {
        assert_eq!(Err(ItemError::TotalOverflow(ItemId(1))),
                   OrderItem::new(ItemId(1), 1, "Gift card",
                                  10_000_000_000_000_000_000, 2));
        assert_eq!(Some(u64::MAX), line_total(u64::MAX, 1));
        assert_eq!(None, line_total(u64::MAX, 2));

        let mut order = mk_order();
        order.items.push(OrderItem::new(
            ItemId(3), 12, "Gift card", 5_000_000_000_000, 1).unwrap());
        assert_eq!(Err(ItemError::TotalOverflow(ItemId(3))),
                   order.adjust_item_quantity(UserRole::Operator, ItemId(3), 4_000_000)
                   .map(|_| ()));
        assert_eq!(1, order.items[2].quantity);
        assert_eq!(5_000_000_000_000, order.items[2].total_price_cents);
    }

    #[test]
    fn test_shipping_placeholders() {
        let ship = ShippingInfo::or_placeholders(
            Some("Ana".to_string()), Some("  ".to_string()), None,
            Some("555-0100".to_string()));
        assert_eq!(ShippingInfo {
            full_name: "Ana".to_string(),
            address: "NA".to_string(),
            city: "NA".to_string(),
            phone: "555-0100".to_string(),
        }, ship);
        assert_eq!("Customer",
                   ShippingInfo::or_placeholders(None, None, None, None).full_name);
    }

    #[test]
    fn test_tabs() {
        let mut orders = Vec::new();
        for (ii, s) in OrderStatus::ALL.iter().cloned().enumerate() {
            let mut o = mk_order();
            o.id = Some(OrderId(ii as u64));
            o.status = s;
            orders.push(o);
        }

        let active: Vec<OrderStatus> = OrderTab::Active.filter(&orders)
            .into_iter().map(|o| o.status).collect();
        let history: Vec<OrderStatus> = OrderTab::History.filter(&orders)
            .into_iter().map(|o| o.status).collect();

        assert_eq!(vec![OrderStatus::Pending, OrderStatus::Confirm,
                        OrderStatus::InProcess, OrderStatus::Ready], active);
        assert_eq!(vec![OrderStatus::Completed, OrderStatus::Cancelled], history);
    }

    #[test]
    fn test_order_serializes_status_id() {
        let order = mk_order();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!("pending", json["status"]);
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.items, back.items);
    }
}
