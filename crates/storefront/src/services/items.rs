//! Item service.
//!
//! Creation only needs an identity; mutation and deletion run the
//! ownership-or-elevation policy: the owner may always act, and holders of
//! the matching elevated permission may act on items they don't own.

use threadline_core::ItemId;

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::models::{Item, ItemDraft, ItemPatch};
use crate::services::authz;
use crate::store::Store;

/// Item service.
pub struct ItemService<'a> {
    store: &'a dyn Store,
}

impl<'a> ItemService<'a> {
    /// Create a new item service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Create an item owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` for anonymous callers and
    /// `AppError::Validation` for an empty title.
    pub async fn create_item(
        &self,
        ctx: &RequestContext,
        draft: ItemDraft,
    ) -> Result<Item, AppError> {
        let caller = ctx.require_user()?;

        if draft.title.trim().is_empty() {
            return Err(AppError::Validation("item title cannot be empty".to_owned()));
        }

        let item = self.store.create_item(caller.id, &draft).await?;
        tracing::info!(item_id = %item.id, owner = %caller.id, "item created");
        Ok(item)
    }

    /// Apply a partial update to an item.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the item doesn't exist and
    /// `AppError::Forbidden` unless the caller owns it or holds an elevated
    /// update permission.
    pub async fn update_item(
        &self,
        ctx: &RequestContext,
        item_id: ItemId,
        patch: ItemPatch,
    ) -> Result<Item, AppError> {
        let caller = ctx.require_user()?;

        let item = self
            .store
            .item_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no item with id {item_id}")))?;

        authz::require_owner_or_permission(
            caller.id,
            &caller.permissions,
            item.owner,
            authz::ITEM_UPDATE_PERMISSIONS,
        )?;

        let updated = self.store.update_item(item_id, &patch).await?;
        Ok(updated)
    }

    /// Delete an item.
    ///
    /// The policy is owner OR elevated delete permission - both paths are
    /// sufficient on their own, neither is required of the other.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the item doesn't exist and
    /// `AppError::Forbidden` if neither policy arm holds.
    pub async fn delete_item(
        &self,
        ctx: &RequestContext,
        item_id: ItemId,
    ) -> Result<ItemId, AppError> {
        let caller = ctx.require_user()?;

        let item = self
            .store
            .item_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no item with id {item_id}")))?;

        authz::require_owner_or_permission(
            caller.id,
            &caller.permissions,
            item.owner,
            authz::ITEM_DELETE_PERMISSIONS,
        )?;

        self.store.delete_item(item_id).await?;
        tracing::info!(item_id = %item_id, deleted_by = %caller.id, "item deleted");
        Ok(item_id)
    }
}
