//! Cart service.
//!
//! The cart invariant is one row per `(user, item)` pair. Adding delegates
//! to the store's atomic create-or-increment, so there is no window where
//! two concurrent adds can both observe "absent" and create duplicate rows,
//! or both read the same quantity and lose an increment.

use threadline_core::{CartItemId, ItemId};

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::models::{CartItem, CartLine};
use crate::store::Store;

/// Cart service.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Add one unit of an item to the caller's cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` for anonymous callers and
    /// `AppError::NotFound` if the item doesn't exist.
    pub async fn add_to_cart(
        &self,
        ctx: &RequestContext,
        item_id: ItemId,
    ) -> Result<CartItem, AppError> {
        let caller = ctx.require_user()?;

        self.store
            .item_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no item with id {item_id}")))?;

        let cart_item = self.store.upsert_cart_item(caller.id, item_id).await?;
        Ok(cart_item)
    }

    /// Remove a cart row the caller owns.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the row doesn't exist and
    /// `AppError::Forbidden` if it belongs to someone else.
    pub async fn remove_from_cart(
        &self,
        ctx: &RequestContext,
        cart_item_id: CartItemId,
    ) -> Result<CartItemId, AppError> {
        let caller = ctx.require_user()?;

        let cart_item = self
            .store
            .cart_item_by_id(cart_item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no cart item with id {cart_item_id}")))?;

        if cart_item.user_id != caller.id {
            return Err(AppError::Forbidden(
                "this cart item isn't yours".to_owned(),
            ));
        }

        self.store.delete_cart_item(cart_item_id).await?;
        Ok(cart_item_id)
    }

    /// The caller's cart, joined with current item records.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` for anonymous callers.
    pub async fn view(&self, ctx: &RequestContext) -> Result<Vec<CartLine>, AppError> {
        let caller = ctx.require_user()?;
        let lines = self.store.cart_for_user(caller.id).await?;
        Ok(lines)
    }
}
