//! Authorization guards.
//!
//! Pure decision functions, evaluated before any domain operation executes.
//! No I/O happens here: callers fetch whatever records the decision needs
//! and pass the facts in. A failed guard is terminal for the request.

use threadline_core::{Permission, PermissionSet, UserId};

use crate::error::AppError;

/// Elevated permissions that allow deleting an item one does not own.
pub const ITEM_DELETE_PERMISSIONS: &[Permission] = &[Permission::Admin, Permission::ItemDelete];

/// Elevated permissions that allow updating an item one does not own.
pub const ITEM_UPDATE_PERMISSIONS: &[Permission] = &[Permission::Admin, Permission::ItemUpdate];

/// Elevated permissions that allow changing another user's permission set.
pub const PERMISSION_UPDATE_PERMISSIONS: &[Permission] =
    &[Permission::Admin, Permission::PermissionUpdate];

/// Require an established identity.
///
/// # Errors
///
/// Returns `AppError::Unauthenticated` if the caller has none.
pub fn require_authenticated(caller: Option<UserId>) -> Result<UserId, AppError> {
    caller.ok_or_else(|| AppError::Unauthenticated("you must be signed in to do that".to_owned()))
}

/// Require a non-empty intersection between the caller's permissions and the
/// required set.
///
/// # Errors
///
/// Returns `AppError::Forbidden` naming the missing permissions.
pub fn require_any_permission(
    held: &PermissionSet,
    required: &[Permission],
) -> Result<(), AppError> {
    if held.allows_any(required) {
        return Ok(());
    }
    let wanted: Vec<&str> = required.iter().map(Permission::as_str).collect();
    Err(AppError::Forbidden(format!(
        "you need one of: {}",
        wanted.join(", ")
    )))
}

/// The ownership-or-elevation policy for item mutations: allow if the caller
/// owns the resource OR holds any of the listed elevated permissions.
///
/// # Errors
///
/// Returns `AppError::Forbidden` if neither condition holds.
pub fn require_owner_or_permission(
    caller: UserId,
    held: &PermissionSet,
    owner: UserId,
    elevated: &[Permission],
) -> Result<(), AppError> {
    if caller == owner || held.allows_any(elevated) {
        return Ok(());
    }
    Err(AppError::Forbidden(
        "you don't own this and don't have permission to change it".to_owned(),
    ))
}
