//! Core types for Dealdesk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod code;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use code::{CodeError, RedemptionCode};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, DiscountValue, Price};
pub use status::*;
