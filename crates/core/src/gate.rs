//! Access gate: which view a vendor gets to see.
//!
//! The gate is a pure function of the session and the shop account. Checks
//! run in a fixed order and the first match wins; each stage assumes the
//! previous one passed:
//!
//! | Order | Condition                                             | State                  |
//! |-------|-------------------------------------------------------|------------------------|
//! | 1     | auth operation pending, or identity not checked yet   | `Loading`              |
//! | 2     | no signed-in identity                                 | `Unauthenticated`      |
//! | 3     | no shop account for the identity                      | `RegistrationRequired` |
//! | 4     | account not approved                                  | `PendingApproval`      |
//! | 5     | no subscription ID, or state not active/trialing      | `SubscriptionRequired` |
//! | 6     | otherwise                                             | `Authorized`           |

use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountLookup};
use crate::session::Session;

/// The view the dashboard should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessState {
    Loading,
    Unauthenticated,
    RegistrationRequired,
    PendingApproval,
    SubscriptionRequired,
    Authorized,
}

impl AccessState {
    /// The full-screen view rendered instead of the requested content.
    ///
    /// `None` for `Loading` (spinner) and `Authorized` (requested content).
    #[must_use]
    pub const fn substitute_view(self) -> Option<&'static str> {
        match self {
            Self::Unauthenticated => Some("sign-in"),
            Self::RegistrationRequired => Some("shop-registration"),
            Self::PendingApproval => Some("pending-approval"),
            Self::SubscriptionRequired => Some("subscription"),
            Self::Loading | Self::Authorized => None,
        }
    }

    /// Whether the requested content may be rendered.
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized)
    }
}

impl std::fmt::Display for AccessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::RegistrationRequired => write!(f, "registration required"),
            Self::PendingApproval => write!(f, "pending approval"),
            Self::SubscriptionRequired => write!(f, "subscription required"),
            Self::Authorized => write!(f, "authorized"),
        }
    }
}

/// Evaluate the gate for a session and an optional account.
///
/// `None` means "no shop record exists"; an account with `approved: false`
/// is passed as `Some` and lands on `PendingApproval`.
#[must_use]
pub fn evaluate(session: &Session, account: Option<&Account>) -> AccessState {
    if session.is_pending() || !session.is_checked() {
        return AccessState::Loading;
    }
    if session.identity().is_none() {
        return AccessState::Unauthenticated;
    }
    let Some(account) = account else {
        return AccessState::RegistrationRequired;
    };
    if !account.approved {
        return AccessState::PendingApproval;
    }
    if !account.has_active_subscription() {
        return AccessState::SubscriptionRequired;
    }
    AccessState::Authorized
}

/// Evaluate the gate while the account lookup may still be in flight.
///
/// Identical to [`evaluate`] except that a signed-in identity whose account
/// lookup has not completed yields `Loading` instead of
/// `RegistrationRequired`.
#[must_use]
pub fn evaluate_lookup(session: &Session, lookup: &AccountLookup) -> AccessState {
    let state = evaluate(session, lookup.account());
    if state == AccessState::RegistrationRequired && !lookup.is_resolved() {
        return AccessState::Loading;
    }
    state
}
