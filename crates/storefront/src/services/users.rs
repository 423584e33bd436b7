//! User administration.

use threadline_core::{PermissionSet, UserId};

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::models::User;
use crate::services::authz;
use crate::store::Store;

/// User administration service.
pub struct UserService<'a> {
    store: &'a dyn Store,
}

impl<'a> UserService<'a> {
    /// Create a new user service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Replace a user's permission set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` unless the caller holds `ADMIN` or
    /// `PERMISSIONUPDATE`, and `AppError::NotFound` for an unknown target.
    pub async fn update_permissions(
        &self,
        ctx: &RequestContext,
        target: UserId,
        permissions: PermissionSet,
    ) -> Result<User, AppError> {
        let caller = ctx.require_user()?;
        authz::require_any_permission(
            &caller.permissions,
            authz::PERMISSION_UPDATE_PERMISSIONS,
        )?;

        self.store
            .user_by_id(target)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no user with id {target}")))?;

        let updated = self.store.update_permissions(target, &permissions).await?;
        tracing::info!(
            target = %target,
            changed_by = %caller.id,
            permissions = ?updated.permissions.to_strings(),
            "permissions updated"
        );
        Ok(updated)
    }
}
