//! Unified error handling for the dashboard client.

use dealdesk_core::{CodeError, CouponInputError, EmailError, RegistrationError, UserIdentity};
use thiserror::Error;

use crate::config::ConfigError;
use crate::notify::Notice;

/// A record from the backend that does not fit the domain model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed {resource} response: {field} {reason}")]
pub struct MalformedResponseError {
    pub resource: String,
    pub field: String,
    pub reason: String,
}

impl MalformedResponseError {
    pub fn new(
        resource: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from the REST API.
///
/// `Clone` so that a single failed request can be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Request never produced a response (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Transport(String),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Missing or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Response body did not match the expected shape.
    #[error(transparent)]
    Malformed(#[from] MalformedResponseError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited(_) => Some(429),
            Self::Transport(_) | Self::Unauthorized(_) | Self::Malformed(_) => None,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// Failures that point at the backend rather than the vendor.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Malformed(_) => true,
            Self::Transport(_) | Self::RateLimited(_) | Self::Unauthorized(_) => false,
        }
    }
}

/// Sign-in, sign-out and session restore failures.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A redemption code that the backend does not know (or no longer honours).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid or expired code")]
pub struct NotFoundError {
    pub code: String,
}

/// Failures of a code lookup.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Application-level error type for the dashboard.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// Input rejected before any request was sent.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Operation not possible in the current state.
    #[error("{0}")]
    Conflict(String),
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound(e) => Self::NotFound(e),
            LookupError::Api(e) => Self::Api(e),
        }
    }
}

impl From<CouponInputError> for AppError {
    fn from(err: CouponInputError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<CodeError> for AppError {
    fn from(err: CodeError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl AppError {
    /// Whether the failure should be reported to Sentry.
    #[must_use]
    pub const fn is_server_side(&self) -> bool {
        match self {
            Self::Api(e) | Self::Auth(AuthError::Api(e)) => e.is_server_side(),
            Self::Config(_) => true,
            _ => false,
        }
    }

    /// The toast shown to the vendor.
    #[must_use]
    pub fn notice(&self) -> Notice {
        let message = match self {
            Self::Api(ApiError::Transport(_))
            | Self::Auth(AuthError::Api(ApiError::Transport(_))) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            Self::Api(ApiError::RateLimited(secs)) => {
                format!("Too many requests. Try again in {secs} seconds.")
            }
            Self::Api(ApiError::Unauthorized(_)) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            Self::Api(e) if e.is_server_side() => {
                "Something went wrong on our side. Please try again.".to_string()
            }
            Self::Api(ApiError::Status { message, .. }) => message.clone(),
            _ => self.to_string(),
        };
        Notice::error(message)
    }

    /// Log the error and capture server-side failures to Sentry.
    pub fn report(&self) {
        if self.is_server_side() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Dashboard request error"
            );
        } else {
            tracing::warn!(error = %self, "Dashboard request failed");
        }
    }
}

/// Set the Sentry user context from the signed-in vendor.
pub fn set_sentry_user(identity: &UserIdentity) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(identity.uid.to_string()),
            email: Some(identity.email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoticeLevel;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound(NotFoundError {
            code: "ZZZ999".to_string(),
        });
        assert_eq!(err.to_string(), "Invalid or expired code");

        let err = AppError::Validation("title is required".to_string());
        assert_eq!(err.to_string(), "Invalid input: title is required");
    }

    #[test]
    fn test_server_side_classification() {
        let status = |status| ApiError::Status {
            status,
            message: "boom".to_string(),
        };
        assert!(AppError::Api(status(502)).is_server_side());
        assert!(!AppError::Api(status(422)).is_server_side());
        assert!(AppError::Api(MalformedResponseError::new("coupons", "id", "is missing").into())
            .is_server_side());
        assert!(!AppError::Auth(AuthError::InvalidCredentials).is_server_side());
    }

    #[test]
    fn test_notice_messages() {
        let notice = AppError::Api(ApiError::Status {
            status: 422,
            message: "Title already used".to_string(),
        })
        .notice();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Title already used");

        let notice = AppError::Api(ApiError::Status {
            status: 500,
            message: "stack trace here".to_string(),
        })
        .notice();
        assert!(!notice.message.contains("stack trace"));

        let notice = AppError::Api(ApiError::RateLimited(30)).notice();
        assert!(notice.message.contains("30 seconds"));
    }

    #[test]
    fn test_malformed_display() {
        let err = MalformedResponseError::new("coupons", "discount", "is missing");
        assert_eq!(err.to_string(), "Malformed coupons response: discount is missing");
    }
}
