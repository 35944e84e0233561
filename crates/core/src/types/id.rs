//! Newtype IDs for type-safe record references.
//!
//! The backend hands out opaque string document IDs. The `define_id!` macro
//! wraps them so a `CouponId` can never be passed where a `ShopId` is expected.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use dealdesk_core::define_id;
/// define_id!(ShopId);
/// define_id!(CouponId);
///
/// let shop_id = ShopId::new("shop_1");
/// let coupon_id = CouponId::new("shop_1");
///
/// // These are different types, so this won't compile:
/// // let _: ShopId = coupon_id;
/// # let _ = (shop_id, coupon_id);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ShopId);
define_id!(SubscriptionId);
define_id!(CouponId);
define_id!(RedemptionId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_as_str() {
        let id = CouponId::new("cpn_42");
        assert_eq!(id.as_str(), "cpn_42");
        assert_eq!(id.to_string(), "cpn_42");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = ShopId::from("shop_9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"shop_9\"");

        let parsed: ShopId = serde_json::from_str("\"shop_9\"").unwrap();
        assert_eq!(parsed, id);
    }
}
