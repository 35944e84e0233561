//! Counter-side redemption: enter or scan a code, look it up, confirm it.

use std::future::Future;

use dealdesk_core::{CodeError, Redemption, RedemptionCode, RedemptionId};
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use crate::api::ApiClient;
use crate::cache::PageCache;
use crate::error::{ApiError, AppError, LookupError};
use crate::notify::Notifier;

/// Looks codes up and confirms redemptions.
pub trait CodeLookup: Send + Sync {
    fn validate_code(
        &self,
        code: &RedemptionCode,
    ) -> impl Future<Output = Result<Redemption, LookupError>> + Send;

    fn confirm(&self, id: &RedemptionId)
    -> impl Future<Output = Result<Redemption, ApiError>> + Send;
}

impl CodeLookup for ApiClient {
    fn validate_code(
        &self,
        code: &RedemptionCode,
    ) -> impl Future<Output = Result<Redemption, LookupError>> + Send {
        Self::validate_code(self, code)
    }

    fn confirm(
        &self,
        id: &RedemptionId,
    ) -> impl Future<Output = Result<Redemption, ApiError>> + Send {
        self.confirm_redemption(id)
    }
}

/// A scanned payload that does not carry a usable code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("scan payload is empty")]
    Empty,
    #[error("scan URL carries no code")]
    NoCode,
    #[error(transparent)]
    InvalidCode(#[from] CodeError),
}

/// Extract a code from a QR payload.
///
/// The payload is either the bare code or an `http(s)` URL with the code in
/// the `code` query parameter or as the last path segment.
///
/// # Errors
///
/// Returns a [`DecodeError`] if no valid code can be found.
pub fn decode_scan(payload: &str) -> Result<RedemptionCode, DecodeError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }

    let lower = payload.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Ok(RedemptionCode::parse(payload)?);
    }

    let url = Url::parse(payload).map_err(|_| DecodeError::NoCode)?;
    if let Some((_, code)) = url.query_pairs().find(|(name, _)| name == "code") {
        return Ok(RedemptionCode::parse(&code)?);
    }

    let segment = url
        .path_segments()
        .and_then(|segments| segments.rev().find(|s| !s.is_empty()))
        .ok_or(DecodeError::NoCode)?;
    Ok(RedemptionCode::parse(segment)?)
}

/// What the redeem screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemView {
    /// Code entry, with the last error message if any.
    Entry {
        input: String,
        error: Option<String>,
    },
    /// A looked-up redemption.
    Detail(Redemption),
}

impl Default for RedeemView {
    fn default() -> Self {
        Self::Entry {
            input: String::new(),
            error: None,
        }
    }
}

/// State of the redeem screen.
///
/// Holds the redemption page cache so a confirmed code drops every cached
/// redemption list.
pub struct RedeemFlow<L> {
    lookup: L,
    view: RedeemView,
    cache: PageCache<Redemption>,
    notifier: Notifier,
}

impl<L: CodeLookup> RedeemFlow<L> {
    #[must_use]
    pub fn new(lookup: L, cache: PageCache<Redemption>, notifier: Notifier) -> Self {
        Self {
            lookup,
            view: RedeemView::default(),
            cache,
            notifier,
        }
    }

    #[must_use]
    pub const fn view(&self) -> &RedeemView {
        &self.view
    }

    /// Replace the typed input and clear any error.
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.view = RedeemView::Entry {
            input: input.into(),
            error: None,
        };
    }

    /// Look up the entered code.
    ///
    /// On success the view moves to the redemption detail. On failure the
    /// entry view stays, with the input intact and an error message.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] for a malformed code (no request is sent),
    /// [`AppError::NotFound`] for an unknown code, or the API error.
    #[instrument(skip(self))]
    pub async fn submit(&mut self) -> Result<Redemption, AppError> {
        let RedeemView::Entry { input, .. } = &self.view else {
            return Err(AppError::Conflict(
                "A redemption is already open".to_string(),
            ));
        };
        let input = input.clone();

        let code = match RedemptionCode::parse(&input) {
            Ok(code) => code,
            Err(e) => return Err(self.reject(input, e.into())),
        };

        match self.lookup.validate_code(&code).await {
            Ok(redemption) => {
                info!(code = %code, status = %redemption.status, "Code found");
                self.view = RedeemView::Detail(redemption.clone());
                Ok(redemption)
            }
            Err(e) => {
                let error = AppError::from(e);
                error.report();
                if !matches!(error, AppError::NotFound(_)) {
                    self.notifier.publish(error.notice());
                }
                Err(self.reject(input, error))
            }
        }
    }

    /// Handle a camera scan.
    ///
    /// Payloads without a valid code are ignored and return `None`, so the
    /// scanner keeps running.
    pub async fn submit_scan(&mut self, payload: &str) -> Option<Result<Redemption, AppError>> {
        match decode_scan(payload) {
            Ok(code) => {
                self.set_input(code.as_str());
                Some(self.submit().await)
            }
            Err(e) => {
                debug!(error = %e, "Ignoring scan");
                None
            }
        }
    }

    /// Confirm the open redemption.
    ///
    /// # Errors
    ///
    /// [`AppError::Conflict`] when no claimed redemption is open, otherwise
    /// the API error. The detail view is unchanged on failure.
    #[instrument(skip(self))]
    pub async fn confirm(&mut self) -> Result<Redemption, AppError> {
        let id = match &self.view {
            RedeemView::Detail(redemption) if redemption.is_confirmable() => {
                redemption.id.clone()
            }
            RedeemView::Detail(redemption) => {
                return Err(AppError::Conflict(format!(
                    "Code {} is already {}",
                    redemption.code, redemption.status
                )));
            }
            RedeemView::Entry { .. } => {
                return Err(AppError::Conflict("No redemption is open".to_string()));
            }
        };

        match self.lookup.confirm(&id).await {
            Ok(redemption) => {
                self.cache.invalidate_all();
                self.notifier
                    .success(format!("Redeemed {}", redemption.coupon_title));
                self.view = RedeemView::Detail(redemption.clone());
                Ok(redemption)
            }
            Err(e) => {
                let error = AppError::Api(e);
                error.report();
                self.notifier.publish(error.notice());
                Err(error)
            }
        }
    }

    /// Return to an empty entry view.
    pub fn back(&mut self) {
        self.view = RedeemView::default();
    }

    fn reject(&mut self, input: String, error: AppError) -> AppError {
        self.view = RedeemView::Entry {
            input,
            error: Some(error.to_string()),
        };
        error
    }
}
