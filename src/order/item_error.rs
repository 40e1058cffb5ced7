use crate::order::ItemId;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ItemError {
    /// Only operators may edit order lines
    #[error("You are not permitted to edit items of this order")]
    NotPermitted,

    /// No such line in the order
    #[error("Could not find item {0} in this order")]
    ItemNotFound(ItemId),

    /// Quantity would drop below one
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),

    /// Line total doesn't fit into cents
    #[error("Total of item {0} is too large")]
    TotalOverflow(ItemId),
}
