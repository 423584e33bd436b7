//! Core types for Threadline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod permission;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use permission::{Permission, PermissionError, PermissionSet};
pub use price::{CurrencyCode, Price, PriceError};
