//! Signed-in session state.
//!
//! A [`Session`] only moves forward: `checked` flips to `true` on the first
//! identity resolution and stays there. The fields are private so the only
//! way to mutate a session is through the transition methods below.

use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId};

/// The signed-in vendor, as reported by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable user ID.
    pub uid: UserId,
    /// Sign-in email.
    pub email: Email,
    /// Optional display name.
    pub display_name: Option<String>,
}

/// Current authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Session {
    identity: Option<UserIdentity>,
    checked: bool,
    pending: bool,
}

impl Session {
    /// A session whose identity has not been resolved yet.
    #[must_use]
    pub const fn unchecked() -> Self {
        Self {
            identity: None,
            checked: false,
            pending: false,
        }
    }

    /// A session that has been resolved to `identity` (or to no identity).
    #[must_use]
    pub const fn resolved(identity: Option<UserIdentity>) -> Self {
        Self {
            identity,
            checked: true,
            pending: false,
        }
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    /// Whether the first identity resolution has completed.
    #[must_use]
    pub const fn is_checked(&self) -> bool {
        self.checked
    }

    /// Whether a sign-in, sign-out or restore is in progress.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Mark an auth operation as started.
    pub const fn begin(&mut self) {
        self.pending = true;
    }

    /// Record the outcome of an identity resolution.
    pub fn resolve(&mut self, identity: Option<UserIdentity>) {
        self.identity = identity;
        self.checked = true;
        self.pending = false;
    }

    /// End a failed auth operation without touching identity or `checked`.
    pub const fn abort(&mut self) {
        self.pending = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn identity() -> UserIdentity {
        UserIdentity {
            uid: UserId::new("u1"),
            email: Email::parse("owner@shop.example").unwrap(),
            display_name: None,
        }
    }

    #[test]
    fn test_checked_never_reverts() {
        let mut session = Session::unchecked();
        assert!(!session.is_checked());

        session.begin();
        session.resolve(None);
        assert!(session.is_checked());

        session.begin();
        session.abort();
        assert!(session.is_checked());
        assert!(!session.is_pending());

        session.begin();
        session.resolve(Some(identity()));
        assert!(session.is_checked());
        assert_eq!(session.identity().map(|i| i.uid.as_str()), Some("u1"));
    }

    #[test]
    fn test_abort_keeps_identity() {
        let mut session = Session::resolved(Some(identity()));
        session.begin();
        assert!(session.is_pending());
        session.abort();
        assert!(session.identity().is_some());
    }
}
