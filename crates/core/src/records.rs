//! Coupon and redemption records, plus the coupon create/update payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CouponId, CouponStatus, DiscountValue, Email, RedemptionCode, RedemptionId, RedemptionStatus,
    ShopId,
};

/// A coupon offered by a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub shop_id: ShopId,
    pub title: String,
    pub description: Option<String>,
    pub discount: DiscountValue,
    pub status: CouponStatus,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Total claimable codes; `None` means unlimited.
    pub quantity: Option<u32>,
    pub redeemed_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Codes still available, or `None` when unlimited.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.quantity
            .map(|quantity| quantity.saturating_sub(self.redeemed_count))
    }

    /// Whether the coupon has passed its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CouponStatus::Expired || self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A customer's claim on a coupon, looked up by code at the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub id: RedemptionId,
    pub coupon_id: CouponId,
    pub coupon_title: String,
    pub code: RedemptionCode,
    pub customer_email: Option<Email>,
    pub status: RedemptionStatus,
    pub claimed_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl Redemption {
    /// Whether the vendor can still confirm this redemption.
    #[must_use]
    pub fn is_confirmable(&self) -> bool {
        self.status == RedemptionStatus::Claimed
    }
}

/// Validation failures for [`CouponInput`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponInputError {
    #[error("title is required")]
    MissingTitle,
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
    #[error("discount must be between 0 and 100 percent, or a positive amount")]
    InvalidDiscount,
    #[error("expiry must be after the start date")]
    ExpiryBeforeStart,
    #[error("quantity must be greater than zero")]
    ZeroQuantity,
}

/// Fields a vendor submits when creating or editing a coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub discount: DiscountValue,
    pub status: CouponStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl CouponInput {
    pub const MAX_TITLE_LENGTH: usize = 120;

    /// A draft coupon with just a title and discount.
    #[must_use]
    pub fn new(title: impl Into<String>, discount: DiscountValue) -> Self {
        Self {
            title: title.into(),
            description: None,
            discount,
            status: CouponStatus::Draft,
            starts_at: None,
            expires_at: None,
            quantity: None,
        }
    }

    /// Check the input before it is sent.
    ///
    /// # Errors
    ///
    /// Returns the first rule the input breaks.
    pub fn validate(&self) -> Result<(), CouponInputError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CouponInputError::MissingTitle);
        }
        if title.chars().count() > Self::MAX_TITLE_LENGTH {
            return Err(CouponInputError::TitleTooLong {
                max: Self::MAX_TITLE_LENGTH,
            });
        }
        if !self.discount.is_valid() {
            return Err(CouponInputError::InvalidDiscount);
        }
        if let (Some(starts), Some(expires)) = (self.starts_at, self.expires_at)
            && expires <= starts
        {
            return Err(CouponInputError::ExpiryBeforeStart);
        }
        if self.quantity == Some(0) {
            return Err(CouponInputError::ZeroQuantity);
        }
        Ok(())
    }
}
