//! Reactive access gate.
//!
//! [`AccessGuard`] watches the session store, looks up the shop account
//! whenever the signed-in vendor changes, and publishes the resulting
//! [`AccessState`]. The state itself is always computed by
//! [`dealdesk_core::evaluate_lookup`]; this module only keeps its inputs
//! current.

use std::future::Future;
use std::time::Duration;

use dealdesk_core::{
    AccessState, Account, AccountLookup, RegistrationFields, Session, UserId, UserIdentity,
    evaluate_lookup,
};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;
use crate::error::{ApiError, AppError};
use crate::notify::Notifier;

/// Reads and creates shop accounts.
pub trait AccountService: Send + Sync {
    /// The account for `identity`, or `None` if no shop was registered.
    fn get_account(
        &self,
        identity: &UserIdentity,
    ) -> impl Future<Output = Result<Option<Account>, ApiError>> + Send;

    fn submit_registration(
        &self,
        fields: &RegistrationFields,
    ) -> impl Future<Output = Result<Account, ApiError>> + Send;
}

impl AccountService for ApiClient {
    fn get_account(
        &self,
        _identity: &UserIdentity,
    ) -> impl Future<Output = Result<Option<Account>, ApiError>> + Send {
        self.my_shop()
    }

    fn submit_registration(
        &self,
        fields: &RegistrationFields,
    ) -> impl Future<Output = Result<Account, ApiError>> + Send {
        self.register_shop(fields)
    }
}

/// Account lookup for one vendor.
#[derive(Debug, Default)]
struct Slot {
    uid: Option<UserId>,
    lookup: AccountLookup,
}

/// First wait before [`AccessGuard::run`] retries a failed account lookup.
const RETRY_BASE: Duration = Duration::from_secs(1);
/// Longest wait between lookup retries.
const RETRY_MAX: Duration = Duration::from_secs(30);

/// Publishes the access state for the current session.
pub struct AccessGuard<A> {
    accounts: A,
    session: watch::Receiver<Session>,
    slot: Mutex<Slot>,
    tx: watch::Sender<AccessState>,
    notifier: Notifier,
    retry_base: Duration,
}

impl<A: AccountService> AccessGuard<A> {
    #[must_use]
    pub fn new(accounts: A, session: watch::Receiver<Session>, notifier: Notifier) -> Self {
        let initial = evaluate_lookup(&session.borrow(), &AccountLookup::Pending);
        let (tx, _) = watch::channel(initial);
        Self {
            accounts,
            session,
            slot: Mutex::new(Slot::default()),
            tx,
            notifier,
            retry_base: RETRY_BASE,
        }
    }

    /// Start lookup retries at `delay` instead of one second.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base = delay;
        self
    }

    /// The last published state.
    #[must_use]
    pub fn current(&self) -> AccessState {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AccessState> {
        self.tx.subscribe()
    }

    /// The shop account, once it has been looked up.
    pub async fn account(&self) -> Option<Account> {
        self.slot.lock().await.lookup.account().cloned()
    }

    /// Bring the account lookup in line with the session and re-evaluate.
    ///
    /// Fetches the account when the signed-in vendor changed or the last
    /// lookup failed. A failed lookup publishes a notice and leaves the
    /// state at `Loading`.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> AccessState {
        let mut slot = self.slot.lock().await;
        let session = self.session.borrow().clone();

        let uid = session.identity().map(|identity| identity.uid.clone());
        if uid != slot.uid {
            slot.uid = uid;
            slot.lookup = AccountLookup::Pending;
        }

        if let Some(identity) = session.identity()
            && !session.is_pending()
            && !slot.lookup.is_resolved()
        {
            self.publish(&session, &slot.lookup);
            if let Err(e) = self.load(&mut slot, identity).await {
                warn!(uid = %identity.uid, error = %e, "Account lookup failed");
            }
        }

        self.evaluate(&slot)
    }

    /// Look the account up again, e.g. after an admin approved the shop.
    ///
    /// # Errors
    ///
    /// Returns the lookup error; the previous lookup result is kept.
    #[instrument(skip(self))]
    pub async fn refresh_account(&self) -> Result<AccessState, ApiError> {
        let mut slot = self.slot.lock().await;
        let session = self.session.borrow().clone();
        if let Some(identity) = session.identity() {
            if slot.uid.as_ref() != Some(&identity.uid) {
                slot.uid = Some(identity.uid.clone());
                slot.lookup = AccountLookup::Pending;
            }
            self.load(&mut slot, identity).await?;
        }
        Ok(self.evaluate(&slot))
    }

    /// Submit shop registration for the signed-in vendor.
    ///
    /// On success the returned account replaces the lookup and the state is
    /// re-evaluated (normally to `PendingApproval`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] without a request when nobody is
    /// signed in, otherwise the service error. Nothing changes on failure.
    #[instrument(skip(self, fields))]
    pub async fn submit_registration(
        &self,
        fields: &RegistrationFields,
    ) -> Result<Account, ApiError> {
        let mut slot = self.slot.lock().await;
        let Some(uid) = self.signed_in_uid() else {
            return Err(ApiError::Unauthorized(
                "Sign in to register a shop".to_string(),
            ));
        };

        match self.accounts.submit_registration(fields).await {
            Ok(account) => {
                if self.signed_in_uid().as_ref() == Some(&uid) {
                    slot.uid = Some(uid);
                    slot.lookup = AccountLookup::Present(account.clone());
                    self.evaluate(&slot);
                }
                self.notifier
                    .success(format!("Registration for {} submitted", account.shop_name));
                Ok(account)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Re-evaluate on every session change until the session store is gone.
    ///
    /// A failed account lookup is retried with exponential backoff (capped
    /// at 30 seconds) until it succeeds or the session changes.
    pub async fn run(&self) {
        let mut rx = self.session.clone();
        let mut delay = self.retry_base;
        loop {
            rx.mark_unchanged();
            self.sync().await;

            if self.lookup_stalled().await {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    () = tokio::time::sleep(delay) => {
                        debug!(?delay, "Retrying account lookup");
                        delay = (delay * 2).min(RETRY_MAX);
                        continue;
                    }
                }
            } else if rx.changed().await.is_err() {
                break;
            }
            delay = self.retry_base;
        }
    }

    /// Signed in, settled, and still without an account lookup result.
    async fn lookup_stalled(&self) -> bool {
        let slot = self.slot.lock().await;
        let session = self.session.borrow().clone();
        session
            .identity()
            .is_some_and(|identity| slot.uid.as_ref() == Some(&identity.uid))
            && !session.is_pending()
            && !slot.lookup.is_resolved()
    }

    fn signed_in_uid(&self) -> Option<UserId> {
        self.session
            .borrow()
            .identity()
            .map(|identity| identity.uid.clone())
    }

    async fn load(&self, slot: &mut Slot, identity: &UserIdentity) -> Result<(), ApiError> {
        let result = self.accounts.get_account(identity).await;

        if self.signed_in_uid().as_ref() != Some(&identity.uid) {
            return Ok(());
        }

        match result {
            Ok(account) => {
                slot.lookup = AccountLookup::from(account);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn evaluate(&self, slot: &Slot) -> AccessState {
        let session = self.session.borrow().clone();
        if slot.uid.as_ref() == session.identity().map(|i| &i.uid) {
            self.publish(&session, &slot.lookup)
        } else {
            self.publish(&session, &AccountLookup::Pending)
        }
    }

    fn publish(&self, session: &Session, lookup: &AccountLookup) -> AccessState {
        let next = evaluate_lookup(session, lookup);
        let changed = self.tx.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
        if changed {
            info!(state = %next, "Access state changed");
        }
        next
    }

    fn fail(&self, error: ApiError) -> ApiError {
        let app = AppError::Api(error.clone());
        app.report();
        self.notifier.publish(app.notice());
        error
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    use dealdesk_core::{
        Email, RegistrationDraft, ShopCategory, ShopId, SubscriptionId, SubscriptionState,
    };

    use super::*;

    #[derive(Default)]
    struct FakeAccounts {
        accounts: StdMutex<HashMap<String, Account>>,
        offline: AtomicBool,
        lookups: AtomicUsize,
    }

    impl FakeAccounts {
        fn put(&self, uid: &str, account: Account) {
            self.accounts
                .lock()
                .unwrap()
                .insert(uid.to_string(), account);
        }
    }

    impl AccountService for Arc<FakeAccounts> {
        async fn get_account(&self, identity: &UserIdentity) -> Result<Option<Account>, ApiError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    status: 502,
                    message: "bad gateway".to_string(),
                });
            }
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .get(identity.uid.as_str())
                .cloned())
        }

        async fn submit_registration(
            &self,
            fields: &RegistrationFields,
        ) -> Result<Account, ApiError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(ApiError::Transport("offline".to_string()));
            }
            Ok(account(&fields.shop_name, false, None))
        }
    }

    fn account(name: &str, approved: bool, sub: Option<SubscriptionState>) -> Account {
        Account {
            shop_id: ShopId::new("shop_1"),
            shop_name: name.to_string(),
            registered: true,
            approved,
            active_subscription_id: sub.map(|_| SubscriptionId::new("sub_1")),
            subscription_state: sub.unwrap_or_default(),
        }
    }

    fn signed_in(uid: &str) -> Session {
        Session::resolved(Some(UserIdentity {
            uid: UserId::new(uid),
            email: Email::parse("owner@cafe.test").unwrap(),
            display_name: None,
        }))
    }

    fn guard(
        session: Session,
    ) -> (
        AccessGuard<Arc<FakeAccounts>>,
        Arc<FakeAccounts>,
        watch::Sender<Session>,
    ) {
        let accounts = Arc::new(FakeAccounts::default());
        let (tx, rx) = watch::channel(session);
        (
            AccessGuard::new(accounts.clone(), rx, Notifier::default()),
            accounts,
            tx,
        )
    }

    #[tokio::test]
    async fn test_unchecked_session_is_loading() {
        let (guard, accounts, _tx) = guard(Session::unchecked());
        assert_eq!(guard.current(), AccessState::Loading);
        assert_eq!(guard.sync().await, AccessState::Loading);
        assert_eq!(accounts.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signed_out_skips_lookup() {
        let (guard, accounts, _tx) = guard(Session::resolved(None));
        assert_eq!(guard.sync().await, AccessState::Unauthenticated);
        assert_eq!(accounts.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_absent_vs_unapproved() {
        let (guard, accounts, tx) = guard(signed_in("u_1"));
        assert_eq!(guard.sync().await, AccessState::RegistrationRequired);

        accounts.put("u_2", account("Corner Cafe", false, None));
        tx.send_replace(signed_in("u_2"));
        assert_eq!(guard.sync().await, AccessState::PendingApproval);
        assert_eq!(accounts.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lookup_is_cached_per_uid() {
        let (guard, accounts, _tx) = guard(signed_in("u_1"));
        guard.sync().await;
        guard.sync().await;
        assert_eq!(accounts.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_stays_loading_and_retries() {
        let (guard, accounts, _tx) = guard(signed_in("u_1"));
        let mut notices = guard.notifier.subscribe();
        accounts.offline.store(true, Ordering::SeqCst);

        assert_eq!(guard.sync().await, AccessState::Loading);
        assert!(notices.recv().await.is_ok());

        accounts.offline.store(false, Ordering::SeqCst);
        accounts.put(
            "u_1",
            account("Corner Cafe", true, Some(SubscriptionState::Active)),
        );
        assert_eq!(guard.sync().await, AccessState::Authorized);
    }

    #[tokio::test]
    async fn test_registration_moves_to_pending_approval() {
        let (guard, _accounts, _tx) = guard(signed_in("u_1"));
        assert_eq!(guard.sync().await, AccessState::RegistrationRequired);

        let draft = RegistrationDraft::new()
            .with_shop("Corner Cafe", ShopCategory::Cafe, "")
            .with_contact("Sam", "sam@cafe.test", "555 010 2030")
            .with_location("1 Main St", "Springfield", "US");
        let fields = draft.finish().unwrap();

        let account = guard.submit_registration(&fields).await.unwrap();
        assert!(!account.approved);
        assert_eq!(guard.current(), AccessState::PendingApproval);
        assert_eq!(guard.account().await.unwrap().shop_name, "Corner Cafe");
    }

    #[tokio::test]
    async fn test_failed_registration_changes_nothing() {
        let (guard, accounts, _tx) = guard(signed_in("u_1"));
        guard.sync().await;
        accounts.offline.store(true, Ordering::SeqCst);

        let fields = RegistrationFields {
            shop_name: "Corner Cafe".to_string(),
            category: ShopCategory::Cafe,
            description: None,
            contact_name: "Sam".to_string(),
            contact_email: Email::parse("sam@cafe.test").unwrap(),
            phone: "5550102030".to_string(),
            address: dealdesk_core::ShopAddress {
                line1: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                country: "US".to_string(),
            },
        };
        assert!(guard.submit_registration(&fields).await.is_err());
        assert_eq!(guard.current(), AccessState::RegistrationRequired);
        assert!(guard.account().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_after_approval() {
        let (guard, accounts, _tx) = guard(signed_in("u_1"));
        accounts.put("u_1", account("Corner Cafe", false, None));
        assert_eq!(guard.sync().await, AccessState::PendingApproval);

        accounts.put("u_1", account("Corner Cafe", true, None));
        assert_eq!(
            guard.refresh_account().await.unwrap(),
            AccessState::SubscriptionRequired
        );

        accounts.put(
            "u_1",
            account("Corner Cafe", true, Some(SubscriptionState::Trialing)),
        );
        assert_eq!(
            guard.refresh_account().await.unwrap(),
            AccessState::Authorized
        );
    }

    #[tokio::test]
    async fn test_run_follows_session() {
        let (guard, accounts, tx) = guard(Session::unchecked());
        accounts.put(
            "u_1",
            account("Corner Cafe", true, Some(SubscriptionState::Active)),
        );
        let guard = Arc::new(guard);
        let mut states = guard.subscribe();

        let runner = tokio::spawn({
            let guard = guard.clone();
            async move { guard.run().await }
        });

        tx.send_replace(signed_in("u_1"));
        tokio::time::timeout(
            Duration::from_secs(1),
            states.wait_for(|s| *s == AccessState::Authorized),
        )
        .await
        .unwrap()
        .unwrap();

        tx.send_replace(Session::resolved(None));
        tokio::time::timeout(
            Duration::from_secs(1),
            states.wait_for(|s| *s == AccessState::Unauthenticated),
        )
        .await
        .unwrap()
        .unwrap();

        drop(tx);
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_retries_failed_lookup() {
        let (guard, accounts, tx) = guard(signed_in("u_1"));
        accounts.put(
            "u_1",
            account("Corner Cafe", true, Some(SubscriptionState::Active)),
        );
        accounts.offline.store(true, Ordering::SeqCst);
        let guard = Arc::new(guard.with_retry_delay(Duration::from_millis(10)));
        let mut states = guard.subscribe();

        let runner = tokio::spawn({
            let guard = guard.clone();
            async move { guard.run().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(guard.current(), AccessState::Loading);
        assert!(accounts.lookups.load(Ordering::SeqCst) >= 2);

        accounts.offline.store(false, Ordering::SeqCst);
        tokio::time::timeout(
            Duration::from_secs(1),
            states.wait_for(|s| *s == AccessState::Authorized),
        )
        .await
        .unwrap()
        .unwrap();

        drop(tx);
        runner.await.unwrap();
    }
}
