//! Application state shared by every view.

use std::sync::Arc;

use chrono::NaiveDate;
use dealdesk_core::{AccessState, Coupon, QueryKey, Redemption};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::analytics::{RedemptionReport, redemption_report};
use crate::api::{ApiClient, Coupons, Redemptions};
use crate::cache::PageCache;
use crate::collection::{CachedPages, CollectionViewer};
use crate::config::ClientConfig;
use crate::coupons::CouponManager;
use crate::error::{ApiError, AppError};
use crate::guard::AccessGuard;
use crate::notify::Notifier;
use crate::redeem::RedeemFlow;
use crate::session::SessionStore;

/// Infinite-scroll list of the shop's coupons.
pub type CouponViewer = CollectionViewer<CachedPages<Coupons>>;

/// Infinite-scroll list of claimed codes.
pub type RedemptionViewer = CollectionViewer<CachedPages<Redemptions>>;

/// Application state shared across all views.
///
/// This struct is cheaply cloneable via `Arc`. It owns the single session
/// store and access guard; viewers and flows are created per view.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    api: ApiClient,
    notifier: Notifier,
    session: SessionStore<ApiClient>,
    guard: AccessGuard<ApiClient>,
    coupon_pages: PageCache<Coupon>,
    redemption_pages: PageCache<Redemption>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config)?;
        let notifier = Notifier::default();
        let session = SessionStore::new(api.clone(), notifier.clone());
        let guard = AccessGuard::new(api.clone(), session.subscribe(), notifier.clone());
        let coupon_pages = PageCache::new(config.cache_capacity, config.cache_ttl);
        let redemption_pages = PageCache::new(config.cache_capacity, config.cache_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                notifier,
                session,
                guard,
                coupon_pages,
                redemption_pages,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore<ApiClient> {
        &self.inner.session
    }

    #[must_use]
    pub fn guard(&self) -> &AccessGuard<ApiClient> {
        &self.inner.guard
    }

    /// Restore the session (or sign in with configured credentials) and
    /// evaluate the gate once.
    ///
    /// # Errors
    ///
    /// Returns the sign-in error when configured credentials are rejected.
    /// A failed restore is not an error: the vendor is treated as signed out.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<AccessState, AppError> {
        let restored = self.session().restore().await.ok().flatten();

        if restored.is_none()
            && let Some(credentials) = &self.config().credentials
        {
            self.session()
                .sign_in(&credentials.email, &credentials.password)
                .await?;
        }

        let state = self.guard().sync().await;
        info!(state = %state, "Dashboard ready");
        Ok(state)
    }

    /// Keep the access state in step with the session in the background.
    #[must_use]
    pub fn spawn_guard(&self) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move { state.guard().run().await })
    }

    /// A coupon list for `search`.
    #[must_use]
    pub fn coupon_viewer(&self, search: &str) -> CouponViewer {
        CollectionViewer::new(
            CachedPages::new(
                self.api().clone(),
                self.inner.coupon_pages.clone(),
                self.session().subscribe(),
            ),
            QueryKey::new("coupons", search),
            self.config().page_size,
            self.config().scroll_threshold,
            self.notifier().clone(),
        )
    }

    /// A redemption list for `search`.
    #[must_use]
    pub fn redemption_viewer(&self, search: &str) -> RedemptionViewer {
        CollectionViewer::new(
            CachedPages::new(
                self.api().clone(),
                self.inner.redemption_pages.clone(),
                self.session().subscribe(),
            ),
            QueryKey::new("redemptions", search),
            self.config().page_size,
            self.config().scroll_threshold,
            self.notifier().clone(),
        )
    }

    /// Coupon writes, sharing the coupon page cache with the viewers.
    #[must_use]
    pub fn coupons(&self) -> CouponManager {
        CouponManager::new(
            self.api().clone(),
            self.inner.coupon_pages.clone(),
            self.notifier().clone(),
        )
    }

    /// A fresh redeem screen, sharing the redemption page cache.
    #[must_use]
    pub fn redeem_flow(&self) -> RedeemFlow<ApiClient> {
        RedeemFlow::new(
            self.api().clone(),
            self.inner.redemption_pages.clone(),
            self.notifier().clone(),
        )
    }

    /// Redemption report for the `days` days ending at `today`.
    ///
    /// # Errors
    ///
    /// Returns the first failed page request.
    pub async fn redemption_report(
        &self,
        today: NaiveDate,
        days: u32,
    ) -> Result<RedemptionReport, AppError> {
        let source = CachedPages::<Redemptions>::new(
            self.api().clone(),
            self.inner.redemption_pages.clone(),
            self.session().subscribe(),
        );
        redemption_report(&source, self.config().page_size, today, days)
            .await
            .map_err(|e| {
                let error = AppError::Api(e);
                error.report();
                self.notifier().publish(error.notice());
                error
            })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("access", &self.inner.guard.current())
            .finish_non_exhaustive()
    }
}
