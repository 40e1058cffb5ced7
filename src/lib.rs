//! Order status rules of the storefront, plus the store, identity and
//! notification glue around them.
//!
//! The rules themselves live in [`order`]: [`order::can_transition`] and
//! [`order::available_transitions`] answer who may move an order where.
//! They are pure and need no setup.

pub mod cart;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod markup;
pub mod order;
pub mod status_update;

pub use order::{Order, OrderStatus, UserRole};

pub type Offset = chrono::Utc;
pub type DateTime = chrono::DateTime<Offset>;
