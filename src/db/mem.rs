use async_trait::async_trait;
use tokio::task::spawn_blocking;
use std::sync::{Arc, RwLock};
use std::collections::BTreeMap;
use crate::cart::{Cart, CartItem};
use crate::db::{OrderStore, newest_first};
use crate::error::Error;
use crate::order::{line_total, ItemError, Order, OrderId, OrderStatus,
                   UserId, UserRole, ItemId};

/// In-process store, everything is lost on exit
///
/// Wrapper for InnerDb that is Send, Sync, and async
#[derive(Clone, Default)]
pub struct Db {
    db: Arc<RwLock<InnerDb>>,
}

impl Db {
    pub async fn new() -> Result<Self, Error> {
        Ok(Db::default())
    }

    /// Runs `f` on a blocking thread with the inner db locked for writing
    async fn with_inner<T, F>(&self, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&mut InnerDb) -> Result<T, Error> + Send + 'static,
    {
        let db = self.db.clone();
        spawn_blocking(move || -> Result<T, Error> {
            let mut db = db.write().map_err(|e| format!("lock: {e:?}"))?;
            f(&mut *db)
        }).await.map_err(|e| -> Error { format!("{e:?}").into() })?
    }

    pub async fn debug_stats(&self) -> Result<String, Error> {
        self.with_inner(|db| Ok(db.debug_stats())).await
    }
}

#[async_trait]
impl OrderStore for Db {
    async fn add_order(&mut self, order: &mut Order) -> Result<OrderId, Error> {
        let o = order.clone();
        let stored = self.with_inner(move |db| Ok(db.add_order(o))).await?;
        order.id = stored.id;
        order.status = stored.status;
        stored.id.ok_or_else(|| "order was stored without id".into())
    }

    async fn get_order(&mut self, oid: OrderId) -> Result<Option<Order>, Error> {
        self.with_inner(move |db| Ok(db.orders.get(&oid).cloned())).await
    }

    async fn write_order_status(
        &mut self,
        oid: OrderId,
        status: OrderStatus,
    ) -> Result<bool, Error> {
        self.with_inner(move |db| {
            let Some(order) = db.orders.get_mut(&oid) else {
                log::warn!("write_order_status: no order {oid}");
                return Ok(false)
            };
            log::debug!("write_order_status {oid}: {:?} => {status:?}", order.status);
            order.status = status;
            Ok(true)
        }).await
    }

    async fn orders_for_user(&mut self, uid: UserId) -> Result<Vec<Order>, Error> {
        self.with_inner(move |db| {
            log::debug!("Listing orders placed by user {uid}");
            let mut orders: Vec<Order> = db.orders.values()
                .filter(|o| o.customer == uid)
                .cloned()
                .collect();
            newest_first(&mut orders);
            Ok(orders)
        }).await
    }

    async fn set_item_quantity(
        &mut self,
        oid: OrderId,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<bool, Error> {
        self.with_inner(move |db| {
            let item = db.orders.get_mut(&oid)
                .and_then(|o| o.items.iter_mut().find(|it| it.id == item_id));
            let Some(item) = item else {
                return Ok(false)
            };
            let total = line_total(item.product_price_cents, quantity)
                .ok_or(ItemError::TotalOverflow(item_id))?;
            item.quantity = quantity;
            item.total_price_cents = total;
            Ok(true)
        }).await
    }

    async fn profile_role(&mut self, uid: UserId) -> Result<Option<String>, Error> {
        self.with_inner(move |db| Ok(db.profiles.get(&uid).cloned())).await
    }

    async fn set_profile_role(&mut self, uid: UserId, role: UserRole) -> Result<(), Error> {
        self.with_inner(move |db| {
            db.profiles.insert(uid, role.id().to_string());
            Ok(())
        }).await
    }

    async fn cart(&mut self, uid: UserId) -> Result<Cart, Error> {
        self.with_inner(move |db| {
            Ok(db.carts.get(&uid).cloned().unwrap_or_else(|| Cart::new(uid)))
        }).await
    }

    async fn add_cart_item(&mut self, uid: UserId, item: CartItem) -> Result<Cart, Error> {
        self.with_inner(move |db| {
            log::debug!("add_cart_item {uid}: {} x{}", item.product_id, item.quantity);
            let cart = db.carts.entry(uid).or_insert_with(|| Cart::new(uid));
            cart.add_or_update(item)?;
            Ok(cart.clone())
        }).await
    }

    async fn clear_cart(&mut self, uid: UserId) -> Result<(), Error> {
        self.with_inner(move |db| {
            db.carts.remove(&uid);
            Ok(())
        }).await
    }
}

#[derive(Debug)]
struct InnerDb {
    max_id: OrderId,
    orders: BTreeMap<OrderId, Order>,
    /// `user_type` of each profile, kept raw like the hosted backend does
    profiles: BTreeMap<UserId, String>,
    carts: BTreeMap<UserId, Cart>,
}

impl Default for InnerDb {
    fn default() -> Self {
        InnerDb {
            max_id:   OrderId(0),
            orders:   BTreeMap::new(),
            profiles: BTreeMap::new(),
            carts:    BTreeMap::new(),
        }
    }
}

impl InnerDb {
    fn next_id(&mut self) -> OrderId {
        self.max_id.0 += 1;
        self.max_id
    }

    fn add_order(&mut self, mut order: Order) -> Order {
        let new_id = self.next_id();
        order.id = Some(new_id);
        order.status = OrderStatus::Pending;
        log::info!("Added order {} new id = {new_id}", order.order_number);
        self.orders.insert(new_id, order.clone());
        order
    }

    fn debug_stats(&self) -> String {
        let mut by_status = String::new();
        for s in OrderStatus::ALL.iter().cloned() {
            let n = self.orders.values().filter(|o| o.status == s).count();
            by_status.push_str(&format!("  {:<12}{n}\n", s.id()));
        }
        let s = format!("\
max_id =       {}
Orders:        {}
Profiles:      {}
Carts:         {}

By status:
{by_status}", self.max_id, self.orders.len(), self.profiles.len(), self.carts.len());
        log::debug!("{s}");
        s
    }
}
