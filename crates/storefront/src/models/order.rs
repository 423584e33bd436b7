//! Order domain types.
//!
//! Orders are immutable snapshots. Each `OrderItem` copies the purchased
//! item's attributes at purchase time, so later item mutations (price
//! changes, deletions) never alter what a past order says was bought.

use chrono::{DateTime, Utc};
use serde::Serialize;

use threadline_core::{ItemId, OrderId, Price, UserId};

/// Snapshot of one purchased item.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    /// The item purchased. Reference only; the fields below are the record.
    pub item_id: ItemId,
    /// Title at purchase time.
    pub title: String,
    /// Description at purchase time.
    pub description: String,
    /// Image at purchase time.
    pub image: Option<String>,
    /// Unit price charged.
    pub price: Price,
    /// Units purchased.
    pub quantity: i32,
}

/// A completed order (domain type). Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// User who placed the order.
    pub user_id: UserId,
    /// Snapshot of everything purchased.
    pub items: Vec<OrderItem>,
    /// Authoritative total: sum of price x quantity over `items`.
    pub total: Price,
    /// Payment gateway charge reference.
    pub charge_id: String,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}

/// Fields for persisting a new order after a successful charge.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Price,
    pub charge_id: String,
}
