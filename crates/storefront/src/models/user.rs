//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use threadline_core::{Email, PermissionSet, UserId};

/// A storefront user (domain type).
///
/// The password hash and any outstanding reset token are deliberately not
/// part of this type; they are only reachable through the dedicated store
/// operations that need them.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address (lowercase, unique).
    pub email: Email,
    /// Capability tags this user holds.
    pub permissions: PermissionSet,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}
