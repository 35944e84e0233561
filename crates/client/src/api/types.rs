//! Wire types for the REST API.
//!
//! Every field is optional on ingress; [`super::conversions`] decides which
//! ones the domain actually requires and reports the rest as malformed.

use serde::{Deserialize, Serialize};

/// Sign-in request body.
#[derive(Debug, Serialize)]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Identity as returned by `/auth/sign-in` and `/auth/me`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityWire {
    pub uid: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Only present on sign-in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Shop account as returned by `/shops/me` and `/shops`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountWire {
    pub shop_id: Option<String>,
    pub shop_name: Option<String>,
    pub registered: Option<bool>,
    pub approved: Option<bool>,
    pub active_subscription_id: Option<String>,
    pub subscription_state: Option<String>,
}

/// Coupon record.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponWire {
    pub id: Option<String>,
    pub shop_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub discount: Option<serde_json::Value>,
    pub status: Option<String>,
    pub starts_at: Option<String>,
    pub expires_at: Option<String>,
    pub quantity: Option<u32>,
    pub redeemed_count: Option<u32>,
    pub created_at: Option<String>,
}

/// Redemption record.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionWire {
    pub id: Option<String>,
    pub coupon_id: Option<String>,
    pub coupon_title: Option<String>,
    pub code: Option<String>,
    pub customer_email: Option<String>,
    pub status: Option<String>,
    pub claimed_at: Option<String>,
    pub redeemed_at: Option<String>,
}
