use async_trait::async_trait;

use crate::cart::{Cart, CartItem};
use crate::error::Error;
use crate::order::{Order, OrderId, OrderStatus, UserId, UserRole, ItemId};

pub mod mem;
#[cfg(feature = "redis_db")]
pub mod redis_db;

/// Where orders and profiles live
///
/// The status authority never writes here itself, callers check
/// permissions first and then ask the store to apply the change.
#[async_trait]
pub trait OrderStore: Send {
    /// Persists a new order, assigns its id and resets it to `Pending`
    async fn add_order(&mut self, order: &mut Order) -> Result<OrderId, Error>;

    /// Returns Ok(None) if there is no such order
    async fn get_order(&mut self, oid: OrderId) -> Result<Option<Order>, Error>;

    async fn read_order_status(
        &mut self,
        oid: OrderId,
    ) -> Result<Option<OrderStatus>, Error> {
        Ok(self.get_order(oid).await?.map(|o| o.status))
    }

    /// Sets the status unconditionally, last write wins
    ///
    /// Returns Ok(false) if the order doesn't exist.
    async fn write_order_status(
        &mut self,
        oid: OrderId,
        status: OrderStatus,
    ) -> Result<bool, Error>;

    /// Orders placed by `uid`, newest first
    async fn orders_for_user(&mut self, uid: UserId) -> Result<Vec<Order>, Error>;

    /// Sets quantity of one line and recomputes its total
    ///
    /// Returns Ok(false) if the order or the item doesn't exist, and an
    /// error if the new total doesn't fit.
    async fn set_item_quantity(
        &mut self,
        oid: OrderId,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<bool, Error>;

    /// Raw `user_type` of the user's profile, Ok(None) if there is none
    async fn profile_role(&mut self, uid: UserId) -> Result<Option<String>, Error>;

    async fn set_profile_role(&mut self, uid: UserId, role: UserRole) -> Result<(), Error>;

    /// The user's cart, empty if they never added anything
    async fn cart(&mut self, uid: UserId) -> Result<Cart, Error>;

    /// Adds a product to the cart, an existing line gets its quantity
    /// increased. Returns the cart as it is afterwards.
    async fn add_cart_item(&mut self, uid: UserId, item: CartItem) -> Result<Cart, Error>;

    async fn clear_cart(&mut self, uid: UserId) -> Result<(), Error>;
}

#[cfg(feature = "redis_db")]
pub use redis_db::Db;
#[cfg(not(feature = "redis_db"))]
pub use mem::Db;

/// Sorts newest first, ties broken by id so listings are stable
pub(crate) fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at)
                   .then_with(|| b.id.cmp(&a.id)));
}

#[cfg(test)]
pub(crate) use unreachable::Unreachable;
