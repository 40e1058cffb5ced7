#![cfg(feature = "redis_db")]

use std::collections::HashMap;
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use crate::cart::{Cart, CartError, CartItem};
use crate::config::Settings;
use crate::db::{OrderStore, newest_first};
use crate::error::Error;
use crate::order::{line_total, ItemError, Order, OrderId, OrderStatus,
                   UserId, UserRole, ItemId};

fn to_err(e: redis::RedisError) -> Error {
    format!("Redis error: {e:?}").into()
}

/// Structure:
///   {prefix}_num_orders                u64
///   {prefix}_order:id                  SerializedData
///   {prefix}_order:id:status           OrderStatus id
///   {prefix}_user:id:orders            Set<OrderId>
///   {prefix}_profile:id:user_type      String
///   {prefix}_cart:id:qty               Hash<ProductId, u32>
///   {prefix}_cart:id:products          Hash<ProductId, SerializedData>
///
/// The status lives under its own key and wins over the one in the blob,
/// so rewriting the blob for an item edit can't undo a status change.
#[derive(Clone)]
pub struct Db {
    c: redis::aio::ConnectionManager,
    prefix: String,
}

impl Db {
    pub async fn new(settings: &Settings) -> Result<Self, Error> {
        log::info!("connecting to {}", settings.redis_url);
        let client = redis::Client::open(settings.redis_url.as_str())
            .map_err(to_err)?;
        let connection = client.get_tokio_connection_manager()
            .await.map_err(to_err)?;

        Ok(Db { c: connection, prefix: settings.key_prefix.clone() })
    }

    /// Returns some debugging info
    pub async fn debug_stats(&mut self) -> Result<String, Error> {
        let (num_orders, dbsize): (Option<u64>, u64) = redis::pipe()
            .get(self.num_orders_key())
            .cmd("DBSIZE")
            .query_async(&mut self.c).await.map_err(to_err)?;
        let ret = format!("\
prefix =       {}
max_id =       {}
Redis keys:    {dbsize}
", self.prefix, num_orders.unwrap_or(0));
        log::debug!("{}", ret);
        Ok(ret)
    }

    /// Blob plus its status key, None if the order doesn't exist
    fn decode_order(
        data: Option<Vec<u8>>,
        status: Option<String>,
    ) -> Result<Option<Order>, Error> {
        let Some(data) = data else {
            return Ok(None)
        };
        let mut order: Order = serde_json::from_slice(&data)?;
        match status.as_deref().map(OrderStatus::from_id) {
            Some(Some(status)) => order.status = status,
            Some(None) => log::warn!("order {:?}: unknown status {status:?}", order.id),
            None => {},
        }
        Ok(Some(order))
    }

    /// Overwrites the whole order blob
    async fn put_order(&mut self, oid: OrderId, order: &Order) -> Result<(), Error> {
        let data: Vec<u8> = serde_json::to_vec(order)?;
        redis::Cmd::set(self.order_key(oid), data)
            .query_async::<_, ()>(&mut self.c).await.map_err(to_err)?;
        Ok(())
    }

    fn key(&self, k: &str) -> String {
        let p = &self.prefix;
        format!("{p}_{k}")
    }

    fn num_orders_key(&self) -> String {
        self.key("num_orders")
    }

    fn order_key(&self, oid: OrderId) -> String {
        self.key(&format!("order:{oid}"))
    }

    fn order_status_key(&self, oid: OrderId) -> String {
        self.key(&format!("order:{oid}:status"))
    }

    fn user_orders_key(&self, uid: UserId) -> String {
        self.key(&format!("user:{uid}:orders"))
    }

    fn profile_role_key(&self, uid: UserId) -> String {
        self.key(&format!("profile:{uid}:user_type"))
    }

    fn cart_qty_key(&self, uid: UserId) -> String {
        self.key(&format!("cart:{uid}:qty"))
    }

    fn cart_products_key(&self, uid: UserId) -> String {
        self.key(&format!("cart:{uid}:products"))
    }
}

/// What the cart remembers about a product besides its quantity
#[derive(Serialize, Deserialize)]
struct CartProduct {
    name: String,
    price_cents: u64,
}

#[async_trait]
impl OrderStore for Db {
    async fn add_order(&mut self, order: &mut Order) -> Result<OrderId, Error> {
        log::debug!("add_order {}", order.order_number);

        let oid: u64 = redis::Cmd::incr(self.num_orders_key(), 1)
            .query_async(&mut self.c).await.map_err(to_err)?;
        let oid = OrderId(oid);
        order.id = Some(oid);
        order.status = OrderStatus::Pending;

        redis::pipe()
            .atomic()
            .set(self.order_key(oid), serde_json::to_vec(order)?)
            .set(self.order_status_key(oid), order.status.id())
            .sadd(self.user_orders_key(order.customer), oid.0)
            .query_async::<_, ()>(&mut self.c).await.map_err(to_err)?;
        Ok(oid)
    }

    async fn get_order(&mut self, oid: OrderId) -> Result<Option<Order>, Error> {
        let (data, status): (Option<Vec<u8>>, Option<String>) = redis::pipe()
            .get(self.order_key(oid))
            .get(self.order_status_key(oid))
            .query_async(&mut self.c).await.map_err(to_err)?;
        Db::decode_order(data, status)
    }

    async fn read_order_status(
        &mut self,
        oid: OrderId,
    ) -> Result<Option<OrderStatus>, Error> {
        let status: Option<String> = redis::Cmd::get(self.order_status_key(oid))
            .query_async(&mut self.c).await.map_err(to_err)?;
        if let Some(status) = status {
            return OrderStatus::from_id(&status)
                .map(Some)
                .ok_or_else(|| format!("order {oid}: unknown status {status:?}").into())
        }
        // Order without a status key, if any, falls back to its blob
        Ok(self.get_order(oid).await?.map(|o| o.status))
    }

    async fn write_order_status(
        &mut self,
        oid: OrderId,
        status: OrderStatus,
    ) -> Result<bool, Error> {
        let exists: bool = redis::Cmd::exists(self.order_key(oid))
            .query_async(&mut self.c).await.map_err(to_err)?;
        if !exists {
            log::warn!("write_order_status: no order {oid}");
            return Ok(false)
        }
        log::debug!("write_order_status {oid} => {status:?}");
        redis::Cmd::set(self.order_status_key(oid), status.id())
            .query_async::<_, ()>(&mut self.c).await.map_err(to_err)?;
        Ok(true)
    }

    async fn orders_for_user(&mut self, uid: UserId) -> Result<Vec<Order>, Error> {
        log::debug!("orders_for_user {uid}");

        let oids: Vec<u64> =
            redis::Cmd::smembers(self.user_orders_key(uid))
            .query_async(&mut self.c).await.map_err(to_err)?;
        // Redis doesn't allow to query for no keys,
        // so it's not just an optimization
        if oids.is_empty() {
            return Ok(Vec::new())
        }

        let mut pipe = redis::pipe();
        for oid in oids.iter() {
            pipe.get(self.order_key(OrderId(*oid)));
        }
        let bin_orders: Vec<Option<Vec<u8>>> =
            pipe.query_async(&mut self.c).await.map_err(to_err)?;

        let mut pipe = redis::pipe();
        for oid in oids.iter() {
            pipe.get(self.order_status_key(OrderId(*oid)));
        }
        let statuses: Vec<Option<String>> =
            pipe.query_async(&mut self.c).await.map_err(to_err)?;

        let mut orders: Vec<Order> = Vec::with_capacity(bin_orders.len());
        for (b, status) in bin_orders.into_iter().zip(statuses) {
            if let Some(order) = Db::decode_order(b, status)? {
                orders.push(order);
            }
        }
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn set_item_quantity(
        &mut self,
        oid: OrderId,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<bool, Error> {
        let Some(mut order) = self.get_order(oid).await? else {
            return Ok(false)
        };
        let Some(item) = order.items.iter_mut().find(|it| it.id == item_id) else {
            return Ok(false)
        };
        let total = line_total(item.product_price_cents, quantity)
            .ok_or(ItemError::TotalOverflow(item_id))?;
        item.quantity = quantity;
        item.total_price_cents = total;
        // Two item edits of one order still race, the later blob wins
        self.put_order(oid, &order).await?;
        Ok(true)
    }

    async fn profile_role(&mut self, uid: UserId) -> Result<Option<String>, Error> {
        redis::Cmd::get(self.profile_role_key(uid))
            .query_async(&mut self.c).await.map_err(to_err)
    }

    async fn set_profile_role(&mut self, uid: UserId, role: UserRole) -> Result<(), Error> {
        log::debug!("set_profile_role {uid} {role}");
        redis::Cmd::set(self.profile_role_key(uid), role.id())
            .query_async(&mut self.c).await.map_err(to_err)
    }

    async fn cart(&mut self, uid: UserId) -> Result<Cart, Error> {
        let (qty, products): (HashMap<u64, u32>, HashMap<u64, Vec<u8>>) =
            redis::pipe()
            .hgetall(self.cart_qty_key(uid))
            .hgetall(self.cart_products_key(uid))
            .query_async(&mut self.c).await.map_err(to_err)?;

        let mut cart = Cart::new(uid);
        for (product_id, quantity) in qty {
            let Some(data) = products.get(&product_id) else {
                log::warn!("cart {uid}: no product data for {product_id}");
                continue
            };
            let p: CartProduct = serde_json::from_slice(data)?;
            cart.items.push(CartItem {
                product_id,
                product_name: p.name,
                product_price_cents: p.price_cents,
                quantity,
            });
        }
        cart.items.sort_by_key(|it| it.product_id);
        Ok(cart)
    }

    async fn add_cart_item(&mut self, uid: UserId, item: CartItem) -> Result<Cart, Error> {
        log::debug!("add_cart_item {uid}: {} x{}", item.product_id, item.quantity);
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity.into())
        }
        let product = CartProduct {
            name: item.product_name.clone(),
            price_cents: item.product_price_cents,
        };

        let (quantity,): (i64,) = redis::pipe()
            .atomic()
            .hset(self.cart_products_key(uid), item.product_id, serde_json::to_vec(&product)?)
            .ignore()
            .hincr(self.cart_qty_key(uid), item.product_id, item.quantity)
            .query_async(&mut self.c).await.map_err(to_err)?;

        let fits = u32::try_from(quantity).ok()
            .and_then(|q| line_total(item.product_price_cents, q))
            .is_some();
        if !fits {
            redis::Cmd::hincr(self.cart_qty_key(uid), item.product_id, -(item.quantity as i64))
                .query_async::<_, ()>(&mut self.c).await.map_err(to_err)?;
            return Err(CartError::TotalOverflow.into())
        }
        self.cart(uid).await
    }

    async fn clear_cart(&mut self, uid: UserId) -> Result<(), Error> {
        log::debug!("clear_cart {uid}");
        redis::pipe()
            .atomic()
            .del(self.cart_qty_key(uid))
            .del(self.cart_products_key(uid))
            .query_async::<_, ()>(&mut self.c).await.map_err(to_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(status: OrderStatus) -> Option<Vec<u8>> {
        let mut order = Order::new(UserId(1), "NC-1", 100);
        order.id = Some(OrderId(3));
        order.status = status;
        Some(serde_json::to_vec(&order).unwrap())
    }

    #[test]
    fn test_status_key_wins_over_blob() {
        let order = Db::decode_order(blob(OrderStatus::Pending),
                                     Some("ready".to_string())).unwrap().unwrap();
        assert_eq!(OrderStatus::Ready, order.status);

        let order = Db::decode_order(blob(OrderStatus::Confirm), None).unwrap().unwrap();
        assert_eq!(OrderStatus::Confirm, order.status);

        let order = Db::decode_order(blob(OrderStatus::Confirm),
                                     Some("shipped".to_string())).unwrap().unwrap();
        assert_eq!(OrderStatus::Confirm, order.status);

        assert!(Db::decode_order(None, Some("ready".to_string())).unwrap().is_none());
    }
}
