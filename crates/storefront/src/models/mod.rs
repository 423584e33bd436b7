//! Domain types for the storefront.
//!
//! These types represent validated domain objects separate from storage row
//! types. Secrets (password hashes, reset tokens) never appear here; they
//! live behind the store contract.

pub mod cart;
pub mod item;
pub mod order;
pub mod user;

pub use cart::{CartItem, CartLine};
pub use item::{Item, ItemDraft, ItemPatch};
pub use order::{Order, OrderDraft, OrderItem};
pub use user::User;
