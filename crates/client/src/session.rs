//! Session store: the single owner of the vendor's [`Session`].
//!
//! Views subscribe through a `watch` channel. Auth operations are
//! serialized; each one either lands completely (identity and flags updated
//! together) or only clears the pending flag.

use std::future::Future;

use dealdesk_core::{Email, Session, UserIdentity};
use secrecy::SecretString;
use tokio::sync::{Mutex, watch};
use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::error::{AppError, AuthError, clear_sentry_user, set_sentry_user};
use crate::notify::Notifier;

/// Authenticates vendors.
pub trait SessionProvider: Send + Sync {
    fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<UserIdentity, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// The identity of an existing session, if one can be restored.
    fn current_identity(
        &self,
    ) -> impl Future<Output = Result<Option<UserIdentity>, AuthError>> + Send;
}

impl SessionProvider for ApiClient {
    fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<UserIdentity, AuthError>> + Send {
        Self::sign_in(self, email, password)
    }

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send {
        Self::sign_out(self)
    }

    fn current_identity(
        &self,
    ) -> impl Future<Output = Result<Option<UserIdentity>, AuthError>> + Send {
        Self::current_identity(self)
    }
}

/// Owns the session and publishes every change.
pub struct SessionStore<P> {
    provider: P,
    tx: watch::Sender<Session>,
    op: Mutex<()>,
    notifier: Notifier,
}

impl<P: SessionProvider> SessionStore<P> {
    /// A store whose identity has not been checked yet.
    #[must_use]
    pub fn new(provider: P, notifier: Notifier) -> Self {
        let (tx, _) = watch::channel(Session::unchecked());
        Self {
            provider,
            tx,
            op: Mutex::new(()),
            notifier,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Resolve the identity of an existing session.
    ///
    /// The first resolution always marks the session as checked: if the
    /// provider fails before anything is known, the vendor is treated as
    /// signed out. Later failures keep the current identity.
    ///
    /// # Errors
    ///
    /// Returns the provider error after publishing a notice.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<Option<UserIdentity>, AuthError> {
        let _op = self.op.lock().await;
        self.tx.send_modify(Session::begin);

        match self.provider.current_identity().await {
            Ok(identity) => {
                if let Some(identity) = &identity {
                    set_sentry_user(identity);
                }
                self.tx.send_modify(|s| s.resolve(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                self.tx.send_modify(|s| {
                    if s.is_checked() {
                        s.abort();
                    } else {
                        s.resolve(None);
                    }
                });
                Err(self.fail(e))
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEmail`] without contacting the provider
    /// if the email does not parse; otherwise the provider error. The
    /// session is unchanged on failure.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserIdentity, AuthError> {
        let email = Email::parse(email).map_err(|e| self.fail(e.into()))?;

        let _op = self.op.lock().await;
        self.tx.send_modify(Session::begin);

        match self.provider.sign_in(&email, password).await {
            Ok(identity) => {
                set_sentry_user(&identity);
                self.tx.send_modify(|s| s.resolve(Some(identity.clone())));
                info!(uid = %identity.uid, "Session started");
                Ok(identity)
            }
            Err(e) => {
                self.tx.send_modify(Session::abort);
                Err(self.fail(e))
            }
        }
    }

    /// Sign out.
    ///
    /// # Errors
    ///
    /// Returns the provider error; the vendor stays signed in.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let _op = self.op.lock().await;
        self.tx.send_modify(Session::begin);

        match self.provider.sign_out().await {
            Ok(()) => {
                clear_sentry_user();
                self.tx.send_modify(|s| s.resolve(None));
                info!("Session ended");
                Ok(())
            }
            Err(e) => {
                self.tx.send_modify(Session::abort);
                Err(self.fail(e))
            }
        }
    }

    fn fail(&self, error: AuthError) -> AuthError {
        warn!(error = %error, "Auth operation failed");
        let app = AppError::Auth(error.clone());
        app.report();
        self.notifier.publish(app.notice());
        error
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use dealdesk_core::UserId;

    use super::*;
    use crate::error::ApiError;

    #[derive(Default)]
    struct FakeProvider {
        restorable: bool,
        offline: AtomicBool,
        sign_in_calls: AtomicUsize,
    }

    fn identity(email: &Email) -> UserIdentity {
        UserIdentity {
            uid: UserId::new("u_1"),
            email: email.clone(),
            display_name: None,
        }
    }

    impl SessionProvider for FakeProvider {
        async fn sign_in(
            &self,
            email: &Email,
            password: &SecretString,
        ) -> Result<UserIdentity, AuthError> {
            use secrecy::ExposeSecret;
            self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
            if password.expose_secret() == "correct horse" {
                Ok(identity(email))
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(ApiError::Transport("offline".to_string()).into());
            }
            Ok(())
        }

        async fn current_identity(&self) -> Result<Option<UserIdentity>, AuthError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(ApiError::Transport("offline".to_string()).into());
            }
            Ok(self
                .restorable
                .then(|| identity(&Email::parse("owner@cafe.test").unwrap())))
        }
    }

    fn password(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[tokio::test]
    async fn test_restore_marks_checked() {
        let store = SessionStore::new(FakeProvider::default(), Notifier::default());
        assert!(!store.current().is_checked());

        assert_eq!(store.restore().await.unwrap(), None);
        let session = store.current();
        assert!(session.is_checked());
        assert!(session.identity().is_none());
    }

    #[tokio::test]
    async fn test_restore_failure_before_check_resolves_signed_out() {
        let provider = FakeProvider {
            restorable: true,
            ..FakeProvider::default()
        };
        provider.offline.store(true, Ordering::SeqCst);
        let store = SessionStore::new(provider, Notifier::default());

        assert!(store.restore().await.is_err());
        assert!(store.current().is_checked());
        assert!(!store.current().is_pending());
    }

    #[tokio::test]
    async fn test_sign_in_flow() {
        let store = SessionStore::new(FakeProvider::default(), Notifier::default());
        let mut rx = store.subscribe();

        let identity = store
            .sign_in("owner@cafe.test", &password("correct horse"))
            .await
            .unwrap();
        assert_eq!(identity.uid.as_str(), "u_1");
        assert!(rx.has_changed().unwrap());
        let session = rx.borrow_and_update().clone();
        assert!(session.is_checked());
        assert!(!session.is_pending());
        assert_eq!(session.identity(), Some(&identity));
    }

    #[tokio::test]
    async fn test_bad_credentials_leave_session_untouched() {
        let notifier = Notifier::default();
        let mut notices = notifier.subscribe();
        let store = SessionStore::new(FakeProvider::default(), notifier);
        store.restore().await.unwrap();
        let before = store.current();

        let err = store
            .sign_in("owner@cafe.test", &password("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(store.current(), before);
        assert_eq!(
            notices.recv().await.unwrap().message,
            "Authentication error: Invalid email or password"
        );
    }

    #[tokio::test]
    async fn test_invalid_email_skips_provider() {
        let store = Arc::new(SessionStore::new(FakeProvider::default(), Notifier::default()));
        let err = store.sign_in("not-an-email", &password("x")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        assert_eq!(store.provider().sign_in_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_out_failure_keeps_identity() {
        let store = SessionStore::new(FakeProvider::default(), Notifier::default());
        store
            .sign_in("owner@cafe.test", &password("correct horse"))
            .await
            .unwrap();

        store.provider().offline.store(true, Ordering::SeqCst);
        assert!(store.sign_out().await.is_err());
        assert!(store.current().identity().is_some());

        store.provider().offline.store(false, Ordering::SeqCst);
        store.sign_out().await.unwrap();
        assert!(store.current().identity().is_none());
        assert!(store.current().is_checked());
    }
}
