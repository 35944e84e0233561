//! CLI subcommands.

pub mod analytics;
pub mod coupons;
pub mod redeem;
pub mod register;
pub mod status;

use std::io::Write;
use std::time::Duration;

use dealdesk_client::{ApiError, AppError, AppState, FetchError, NoticeLevel};
use dealdesk_core::AccessState;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The gate sent the vendor to a substitute view.
    #[error("Dashboard unavailable ({0}): {hint}", hint = gate_hint(*.0))]
    Gate(AccessState),

    /// Invalid command-line input.
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ApiError> for CommandError {
    fn from(err: ApiError) -> Self {
        Self::App(AppError::Api(err))
    }
}

const fn gate_hint(state: AccessState) -> &'static str {
    match state {
        AccessState::Unauthenticated => "set DEALDESK_EMAIL and DEALDESK_PASSWORD",
        AccessState::RegistrationRequired => "run `dealdesk register` first",
        AccessState::PendingApproval => "the shop is waiting for admin approval",
        AccessState::SubscriptionRequired => "start a subscription from the web dashboard",
        AccessState::Loading | AccessState::Authorized => "try again",
    }
}

const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Fail unless the gate allows dashboard content.
pub const fn require_access(state: AccessState) -> Result<(), CommandError> {
    if state.is_authorized() {
        Ok(())
    } else {
        Err(CommandError::Gate(state))
    }
}

/// Stderr echo of notices, drained before the command exits.
pub struct NoticeEcho {
    handle: JoinHandle<()>,
}

impl NoticeEcho {
    /// Start echoing `state`'s notices.
    #[must_use]
    pub fn start(state: &AppState) -> Self {
        let mut rx = state.notifier().subscribe();
        let handle = tokio::spawn(async move {
            loop {
                let notice = match rx.recv().await {
                    Ok(notice) => notice,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                };
                let tag = match notice.level {
                    NoticeLevel::Info => "info",
                    NoticeLevel::Success => "ok",
                    NoticeLevel::Error => "error",
                };
                if writeln!(std::io::stderr().lock(), "[{tag}] {}", notice.message).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Wait until every queued notice is written.
    ///
    /// The channel only closes once every `AppState` handle is dropped, so
    /// drop the state before calling this.
    pub async fn finish(self) {
        match tokio::time::timeout(DRAIN_TIMEOUT, self.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Notice echo failed"),
            Err(_) => debug!("Notice echo still open; exiting without it"),
        }
    }
}
