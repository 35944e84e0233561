//! Conversions from wire types to domain records.

use chrono::{DateTime, Utc};
use dealdesk_core::{
    Account, Coupon, CouponId, DiscountValue, Email, Redemption, RedemptionCode, RedemptionId,
    ShopId, SubscriptionId, UserId, UserIdentity,
};

use super::types::{AccountWire, CouponWire, IdentityWire, RedemptionWire};
use crate::error::MalformedResponseError;

/// Shorthand for building errors about one resource.
struct Ingress(&'static str);

impl Ingress {
    fn error(&self, field: &str, reason: impl Into<String>) -> MalformedResponseError {
        MalformedResponseError::new(self.0, field, reason)
    }

    fn required<T>(&self, value: Option<T>, field: &str) -> Result<T, MalformedResponseError> {
        value.ok_or_else(|| self.error(field, "is missing"))
    }

    fn non_empty(
        &self,
        value: Option<String>,
        field: &str,
    ) -> Result<String, MalformedResponseError> {
        let value = self.required(value, field)?;
        if value.trim().is_empty() {
            return Err(self.error(field, "is empty"));
        }
        Ok(value)
    }

    fn timestamp(&self, value: &str, field: &str) -> Result<DateTime<Utc>, MalformedResponseError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| self.error(field, format!("is not an RFC 3339 timestamp: {e}")))
    }

    fn optional_timestamp(
        &self,
        value: Option<&str>,
        field: &str,
    ) -> Result<Option<DateTime<Utc>>, MalformedResponseError> {
        value.map(|v| self.timestamp(v, field)).transpose()
    }

    fn parsed<T>(&self, value: Option<&str>, field: &str) -> Result<T, MalformedResponseError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.required(value, field)?
            .parse()
            .map_err(|e: T::Err| self.error(field, e.to_string()))
    }
}

pub fn convert_identity(wire: IdentityWire) -> Result<UserIdentity, MalformedResponseError> {
    let ingress = Ingress("identity");
    let email = ingress.required(wire.email, "email")?;
    Ok(UserIdentity {
        uid: UserId::new(ingress.non_empty(wire.uid, "uid")?),
        email: Email::parse(&email).map_err(|e| ingress.error("email", e.to_string()))?,
        display_name: wire.display_name.filter(|name| !name.trim().is_empty()),
    })
}

pub fn convert_account(wire: AccountWire) -> Result<Account, MalformedResponseError> {
    let ingress = Ingress("account");
    let subscription_state = match wire.subscription_state.as_deref() {
        None => dealdesk_core::SubscriptionState::None,
        Some(state) => ingress.parsed(Some(state), "subscriptionState")?,
    };
    Ok(Account {
        shop_id: ShopId::new(ingress.non_empty(wire.shop_id, "shopId")?),
        shop_name: ingress.required(wire.shop_name, "shopName")?,
        registered: wire.registered.unwrap_or(true),
        approved: ingress.required(wire.approved, "approved")?,
        active_subscription_id: wire
            .active_subscription_id
            .filter(|id| !id.trim().is_empty())
            .map(SubscriptionId::new),
        subscription_state,
    })
}

pub fn convert_coupon(wire: CouponWire) -> Result<Coupon, MalformedResponseError> {
    let ingress = Ingress("coupons");

    let discount: DiscountValue =
        serde_json::from_value(ingress.required(wire.discount, "discount")?)
            .map_err(|e| ingress.error("discount", e.to_string()))?;
    if !discount.is_valid() {
        return Err(ingress.error("discount", "is out of range"));
    }

    Ok(Coupon {
        id: CouponId::new(ingress.non_empty(wire.id, "id")?),
        shop_id: ShopId::new(ingress.non_empty(wire.shop_id, "shopId")?),
        title: ingress.non_empty(wire.title, "title")?,
        description: wire.description.filter(|d| !d.trim().is_empty()),
        discount,
        status: ingress.parsed(wire.status.as_deref(), "status")?,
        starts_at: ingress.optional_timestamp(wire.starts_at.as_deref(), "startsAt")?,
        expires_at: ingress.optional_timestamp(wire.expires_at.as_deref(), "expiresAt")?,
        quantity: wire.quantity,
        redeemed_count: wire.redeemed_count.unwrap_or(0),
        created_at: ingress.timestamp(
            &ingress.required(wire.created_at, "createdAt")?,
            "createdAt",
        )?,
    })
}

pub fn convert_redemption(wire: RedemptionWire) -> Result<Redemption, MalformedResponseError> {
    let ingress = Ingress("redemptions");

    let code = ingress.required(wire.code, "code")?;
    let customer_email = wire
        .customer_email
        .filter(|e| !e.trim().is_empty())
        .map(|e| Email::parse(&e).map_err(|err| ingress.error("customerEmail", err.to_string())))
        .transpose()?;

    Ok(Redemption {
        id: RedemptionId::new(ingress.non_empty(wire.id, "id")?),
        coupon_id: CouponId::new(ingress.non_empty(wire.coupon_id, "couponId")?),
        coupon_title: ingress.required(wire.coupon_title, "couponTitle")?,
        code: RedemptionCode::parse(&code).map_err(|e| ingress.error("code", e.to_string()))?,
        customer_email,
        status: ingress.parsed(wire.status.as_deref(), "status")?,
        claimed_at: ingress.timestamp(
            &ingress.required(wire.claimed_at, "claimedAt")?,
            "claimedAt",
        )?,
        redeemed_at: ingress.optional_timestamp(wire.redeemed_at.as_deref(), "redeemedAt")?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dealdesk_core::{CouponStatus, RedemptionStatus, SubscriptionState};
    use serde_json::json;

    use super::*;

    fn coupon_json() -> serde_json::Value {
        json!({
            "id": "c_1",
            "shopId": "shop_1",
            "title": "Free espresso",
            "discount": { "type": "percentage", "percent": "100" },
            "status": "active",
            "expiresAt": "2026-12-31T23:59:59Z",
            "quantity": 50,
            "redeemedCount": 3,
            "createdAt": "2026-01-15T10:00:00+02:00"
        })
    }

    #[test]
    fn test_convert_coupon() {
        let wire: CouponWire = serde_json::from_value(coupon_json()).unwrap();
        let coupon = convert_coupon(wire).unwrap();
        assert_eq!(coupon.id.as_str(), "c_1");
        assert_eq!(coupon.status, CouponStatus::Active);
        assert_eq!(coupon.discount.to_string(), "100% off");
        assert_eq!(coupon.created_at.to_rfc3339(), "2026-01-15T08:00:00+00:00");
        assert!(coupon.starts_at.is_none());
    }

    #[test]
    fn test_convert_coupon_reports_field() {
        let mut value = coupon_json();
        value["status"] = json!("archived");
        let err = convert_coupon(serde_json::from_value(value).unwrap()).unwrap_err();
        assert_eq!(err.resource, "coupons");
        assert_eq!(err.field, "status");

        let mut value = coupon_json();
        value.as_object_mut().unwrap().remove("discount");
        let err = convert_coupon(serde_json::from_value(value).unwrap()).unwrap_err();
        assert_eq!(err.field, "discount");

        let mut value = coupon_json();
        value["discount"] = json!({ "type": "percentage", "percent": "150" });
        let err = convert_coupon(serde_json::from_value(value).unwrap()).unwrap_err();
        assert_eq!(err.reason, "is out of range");

        let mut value = coupon_json();
        value["createdAt"] = json!("yesterday");
        let err = convert_coupon(serde_json::from_value(value).unwrap()).unwrap_err();
        assert_eq!(err.field, "createdAt");
    }

    #[test]
    fn test_convert_account_keeps_unapproved() {
        let wire: AccountWire = serde_json::from_value(json!({
            "shopId": "shop_1",
            "shopName": "Corner Cafe",
            "approved": false
        }))
        .unwrap();
        let account = convert_account(wire).unwrap();
        assert!(!account.approved);
        assert!(account.registered);
        assert_eq!(account.subscription_state, SubscriptionState::None);
        assert!(account.active_subscription_id.is_none());
    }

    #[test]
    fn test_convert_account_requires_approved_flag() {
        let wire: AccountWire = serde_json::from_value(json!({
            "shopId": "shop_1",
            "shopName": "Corner Cafe"
        }))
        .unwrap();
        assert_eq!(convert_account(wire).unwrap_err().field, "approved");
    }

    #[test]
    fn test_convert_redemption() {
        let wire: RedemptionWire = serde_json::from_value(json!({
            "id": "r_1",
            "couponId": "c_1",
            "couponTitle": "Free espresso",
            "code": "abc123",
            "status": "claimed",
            "claimedAt": "2026-03-01T09:00:00Z"
        }))
        .unwrap();
        let redemption = convert_redemption(wire).unwrap();
        assert_eq!(redemption.code.as_str(), "ABC123");
        assert_eq!(redemption.status, RedemptionStatus::Claimed);
        assert!(redemption.is_confirmable());
    }

    #[test]
    fn test_convert_identity() {
        let identity = convert_identity(IdentityWire {
            uid: Some("u_1".to_string()),
            email: Some("Owner@Cafe.TEST".to_string()),
            display_name: Some(String::new()),
            token: None,
        })
        .unwrap();
        assert_eq!(identity.email.as_str(), "Owner@cafe.test");
        assert!(identity.display_name.is_none());

        let err = convert_identity(IdentityWire::default()).unwrap_err();
        assert_eq!(err.field, "email");
    }
}
