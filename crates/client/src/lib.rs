//! Dealdesk Client - REST client and reactive stores for the vendor dashboard.
//!
//! # Architecture
//!
//! - [`api::ApiClient`] talks to the marketplace backend and validates every
//!   record on the way in.
//! - [`session::SessionStore`] owns the session and [`guard::AccessGuard`]
//!   turns it into an [`dealdesk_core::AccessState`]; both publish through
//!   `watch` channels.
//! - [`collection::CollectionViewer`] drives the infinite-scroll lists over
//!   the [`cache::PageCache`].
//! - [`notify::Notifier`] carries toasts to whatever front end is attached.
//!
//! [`state::AppState`] wires all of it together from a [`config::ClientConfig`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod api;
pub mod cache;
pub mod collection;
pub mod config;
pub mod coupons;
pub mod error;
pub mod guard;
pub mod notify;
pub mod redeem;
pub mod session;
pub mod state;
pub mod telemetry;

pub use collection::{CollectionSnapshot, CollectionViewer, FetchError, FetchOutcome, PageSource};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, AppError, AuthError, LookupError, MalformedResponseError, NotFoundError};
pub use guard::{AccessGuard, AccountService};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use redeem::{CodeLookup, DecodeError, RedeemFlow, RedeemView, decode_scan};
pub use session::{SessionProvider, SessionStore};
pub use state::AppState;
