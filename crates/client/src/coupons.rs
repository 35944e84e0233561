//! Coupon mutations.
//!
//! Every successful write drops the coupon page cache so open lists can
//! reload with `invalidate_and_refetch`.

use dealdesk_core::{Coupon, CouponId, CouponInput};
use tracing::{info, instrument};

use crate::api::{ApiClient, Coupons};
use crate::cache::PageCache;
use crate::error::{ApiError, AppError};
use crate::notify::Notifier;

/// Creates, edits and deletes the shop's coupons.
#[derive(Debug, Clone)]
pub struct CouponManager {
    api: ApiClient,
    cache: PageCache<Coupon>,
    notifier: Notifier,
}

impl CouponManager {
    #[must_use]
    pub const fn new(api: ApiClient, cache: PageCache<Coupon>, notifier: Notifier) -> Self {
        Self {
            api,
            cache,
            notifier,
        }
    }

    /// Fetch one coupon, bypassing the page cache.
    ///
    /// # Errors
    ///
    /// Returns the API error after publishing a notice.
    pub async fn get(&self, id: &CouponId) -> Result<Coupon, AppError> {
        self.api
            .get_one::<Coupons>(id.as_str())
            .await
            .map_err(|e| self.fail(e))
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] if the input is invalid (nothing is sent),
    /// otherwise the API error.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, AppError> {
        input.validate()?;
        let coupon = self
            .api
            .create::<Coupons>(input)
            .await
            .map_err(|e| self.fail(e))?;

        info!(coupon_id = %coupon.id, "Coupon created");
        self.saved(format!("Created {}", coupon.title));
        Ok(coupon)
    }

    /// Replace the editable fields of a coupon.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] if the input is invalid (nothing is sent),
    /// otherwise the API error.
    #[instrument(skip(self, input), fields(coupon_id = %id))]
    pub async fn update(&self, id: &CouponId, input: &CouponInput) -> Result<Coupon, AppError> {
        input.validate()?;
        let coupon = self
            .api
            .update::<Coupons>(id.as_str(), input)
            .await
            .map_err(|e| self.fail(e))?;

        info!("Coupon updated");
        self.saved(format!("Saved {}", coupon.title));
        Ok(coupon)
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns the API error after publishing a notice.
    #[instrument(skip(self), fields(coupon_id = %id))]
    pub async fn delete(&self, id: &CouponId) -> Result<(), AppError> {
        self.api
            .delete_one::<Coupons>(id.as_str())
            .await
            .map_err(|e| self.fail(e))?;

        info!("Coupon deleted");
        self.saved("Coupon deleted");
        Ok(())
    }

    fn saved(&self, message: impl Into<String>) {
        self.cache.invalidate_all();
        self.notifier.success(message);
    }

    fn fail(&self, error: ApiError) -> AppError {
        let error = AppError::Api(error);
        error.report();
        self.notifier.publish(error.notice());
        error
    }
}
