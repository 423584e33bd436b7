//! Item domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use threadline_core::{ItemId, Price, UserId};

/// A storefront item (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    /// Unique item ID.
    pub id: ItemId,
    /// Display title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Current price in minor currency units. Authoritative for checkout.
    pub price: Price,
    /// Optional image URL.
    pub image: Option<String>,
    /// User who listed the item.
    pub owner: UserId,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a new item.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemDraft {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub image: Option<String>,
}

/// Partial update for an existing item. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub image: Option<String>,
}
