//! Object-store contract and implementations.
//!
//! The storefront talks to its store through the [`Store`] trait: plain CRUD
//! with filter-style lookups, plus the two conditional primitives the
//! mutation handlers need to be race-free:
//!
//! - [`Store::upsert_cart_item`] - atomic create-or-increment for a
//!   `(user, item)` cart row, so concurrent adds can neither create duplicate
//!   rows nor lose increments.
//! - [`Store::consume_reset_token`] - compare-and-clear of the reset token,
//!   so exactly one of any number of concurrent consumers wins.
//!
//! Single-record writes are atomic; the only multi-record transaction is
//! [`Store::create_order`] (snapshot insert + cart clear).
//!
//! Implementations: [`postgres::PgStore`] for production, [`memory::MemoryStore`]
//! for tests and local development.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use threadline_core::{CartItemId, Email, ItemId, OrderId, PermissionSet, UserId};

use crate::models::{CartItem, CartLine, Item, ItemDraft, ItemPatch, Order, OrderDraft, User};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// The object-store capability the storefront is written against.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity check for the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    // =========================================================================
    // Users
    // =========================================================================

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the email is already registered.
    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
        permissions: &PermissionSet,
    ) -> Result<User, StoreError>;

    /// Get a user by ID.
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Get a user by email.
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;

    /// Get a user together with their password hash, by email.
    ///
    /// Returns `None` if no such user exists.
    async fn password_hash_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, StoreError>;

    /// Attach a reset token and expiry to a user, replacing any outstanding
    /// token (a second request invalidates the first).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn set_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically consume a reset token: if a user exists whose stored token
    /// matches and whose expiry is at or after `now`, set the new password
    /// hash and clear both reset fields in the same write.
    ///
    /// Returns the updated user, or `None` if no user matched (wrong token,
    /// expired, or already consumed). The compare-and-clear is what makes a
    /// token single-use under concurrent consumption.
    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Replace a user's permission set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn update_permissions(
        &self,
        user_id: UserId,
        permissions: &PermissionSet,
    ) -> Result<User, StoreError>;

    // =========================================================================
    // Items
    // =========================================================================

    /// Create an item owned by `owner`.
    async fn create_item(&self, owner: UserId, draft: &ItemDraft) -> Result<Item, StoreError>;

    /// Get an item by ID.
    async fn item_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Apply a partial update to an item.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the item doesn't exist.
    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, StoreError>;

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the item doesn't exist.
    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError>;

    // =========================================================================
    // Cart
    // =========================================================================

    /// Atomic create-or-increment: create the `(user, item)` cart row with
    /// quantity 1, or bump an existing row's quantity by exactly 1.
    ///
    /// Concurrent calls for the same pair must serialize: the final quantity
    /// equals the number of calls, and only one row ever exists.
    async fn upsert_cart_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<CartItem, StoreError>;

    /// Get a cart row by ID.
    async fn cart_item_by_id(&self, id: CartItemId) -> Result<Option<CartItem>, StoreError>;

    /// Delete a cart row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the row doesn't exist.
    async fn delete_cart_item(&self, id: CartItemId) -> Result<(), StoreError>;

    /// Load a user's cart joined with the current item records (authoritative
    /// prices included).
    async fn cart_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Persist an order snapshot and clear the user's cart, as one
    /// transaction. Any failure leaves neither half applied.
    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, StoreError>;

    /// Get an order by ID.
    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
