//! Cart domain types.

use serde::Serialize;

use threadline_core::{CartItemId, ItemId, Price, PriceError, UserId};

use super::item::Item;

/// One row of a user's cart.
///
/// Invariant: at most one `CartItem` exists per `(user_id, item_id)` pair;
/// absence implies quantity 0. Quantity is always >= 1.
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    /// Unique cart row ID.
    pub id: CartItemId,
    /// Owner of the cart row.
    pub user_id: UserId,
    /// Item the row refers to.
    pub item_id: ItemId,
    /// Number of units, >= 1.
    pub quantity: i32,
}

/// A cart row joined with the current item record.
///
/// Checkout works on lines: the item carries the authoritative price at the
/// moment the cart is loaded.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub cart_item: CartItem,
    pub item: Item,
}

impl CartLine {
    /// Price of this line: item price times quantity.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the multiplication overflows.
    pub fn line_total(&self) -> Result<Price, PriceError> {
        self.item.price.checked_mul(i64::from(self.cart_item.quantity))
    }
}
