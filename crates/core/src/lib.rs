//! Dealdesk Core - vendor dashboard state and domain types.
//!
//! This crate holds everything about the vendor dashboard that does not touch
//! the network:
//! - `client` - REST client, reactive stores and the collection viewer
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure state machines - no I/O, no
//! HTTP clients, no async runtime. The client crate drives these machines
//! from network responses.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, prices, codes and statuses
//! - [`session`] / [`account`] - What the backend knows about the vendor
//! - [`gate`] - Maps session and account to the view to render
//! - [`pagination`] / [`scroll`] - Infinite-scroll collection bookkeeping
//! - [`records`] - Coupons and redemptions
//! - [`registration`] - Multi-step shop registration form
//! - [`analytics`] - Redemption series

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod analytics;
pub mod gate;
pub mod pagination;
pub mod records;
pub mod registration;
pub mod scroll;
pub mod session;
pub mod types;

pub use account::{Account, AccountLookup};
pub use gate::{AccessState, evaluate, evaluate_lookup};
pub use pagination::{
    CollectionState, Completion, DEFAULT_PAGE_SIZE, FetchKind, PageTicket, QueryKey,
};
pub use records::{Coupon, CouponInput, CouponInputError, Redemption};
pub use registration::{
    RegistrationDraft, RegistrationError, RegistrationFields, RegistrationStep, ShopAddress,
    ShopCategory,
};
pub use scroll::{DEFAULT_SCROLL_THRESHOLD, ScrollMetrics, ScrollTrigger};
pub use session::{Session, UserIdentity};
pub use types::*;
