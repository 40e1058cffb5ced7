use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::db::OrderStore;
use crate::error::Error;
use crate::order::{line_total, ItemId, Order, OrderItem, ShippingInfo, UserId};

/// One product in a cart
///
/// Name and price are the latest ones seen for the product, they are
/// copied into the order at checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: u64,
    pub product_name: String,
    pub product_price_cents: u64,
    pub quantity: u32,
}

/// A user's cart, every user has exactly one
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub user: UserId,
    /// One line per product, sorted by product id
    pub items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// A line or the order total doesn't fit into cents
    #[error("Order total is too large")]
    TotalOverflow,

    /// Nothing was placed
    #[error("Failed to place order: {0}")]
    Store(String),
}

impl Cart {
    pub fn new(user: UserId) -> Cart {
        Cart { user, items: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds `item`, or adds its quantity to the line already holding
    /// that product
    pub fn add_or_update(&mut self, item: CartItem) -> Result<&CartItem, CartError> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity)
        }

        let idx = match self.items.binary_search_by_key(&item.product_id, |it| it.product_id) {
            Ok(idx) => {
                let line = &mut self.items[idx];
                let quantity = line.quantity.checked_add(item.quantity)
                    .ok_or(CartError::TotalOverflow)?;
                line_total(item.product_price_cents, quantity)
                    .ok_or(CartError::TotalOverflow)?;
                *line = CartItem { quantity, ..item };
                idx
            },
            Err(idx) => {
                line_total(item.product_price_cents, item.quantity)
                    .ok_or(CartError::TotalOverflow)?;
                self.items.insert(idx, item);
                idx
            },
        };
        Ok(&self.items[idx])
    }

    /// Sum of all lines, None on overflow
    pub fn total_cents(&self) -> Option<u64> {
        self.items.iter().try_fold(0u64, |sum, it| {
            sum.checked_add(line_total(it.product_price_cents, it.quantity)?)
        })
    }

    /// Builds the `Pending` order this cart would become
    ///
    /// The cart itself is not touched.
    pub fn to_order(
        &self,
        order_number: impl Into<String>,
        shipping: ShippingInfo,
    ) -> Result<Order, CartError> {
        if self.is_empty() {
            return Err(CartError::EmptyCart)
        }
        let total = self.total_cents().ok_or(CartError::TotalOverflow)?;

        let mut order = Order::new(self.user, order_number, total);
        order.shipping = Some(shipping);
        for (ii, it) in self.items.iter().enumerate() {
            let item = OrderItem::new(
                ItemId(ii as u64 + 1),
                it.product_id,
                it.product_name.clone(),
                it.product_price_cents,
                it.quantity,
            ).map_err(|_| CartError::TotalOverflow)?;
            order.items.push(item);
        }
        Ok(order)
    }
}

fn store_err(e: Error) -> CartError {
    CartError::Store(e.to_string())
}

/// Places an order with everything in `uid`'s cart, then empties the cart
///
/// An empty cart places nothing. Once the order is stored it stays
/// placed, even if clearing the cart fails afterwards.
pub async fn checkout<S: OrderStore>(
    store: &mut S,
    uid: UserId,
    order_number: &str,
    shipping: ShippingInfo,
) -> Result<Order, CartError> {
    log::info!("checkout {uid} as {order_number}");
    let cart = store.cart(uid).await.map_err(store_err)?;
    let mut order = cart.to_order(order_number, shipping)?;

    let oid = store.add_order(&mut order).await.map_err(store_err)?;
    log::info!("checkout {uid}: placed order {oid} with {} lines", order.items.len());

    if let Err(e) = store.clear_cart(uid).await {
        log::warn!("checkout {uid}: order {oid} placed but cart not cleared: {e:?}");
    }
    Ok(order)
}
