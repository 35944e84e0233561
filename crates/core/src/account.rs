//! Shop account record and its lookup state.

use serde::{Deserialize, Serialize};

use crate::types::{ShopId, SubscriptionId, SubscriptionState};

/// A vendor's shop account.
///
/// Exists only after the vendor submits shop registration. `approved` is
/// flipped by an admin, `subscription_state` by payment webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub shop_id: ShopId,
    pub shop_name: String,
    pub registered: bool,
    pub approved: bool,
    pub active_subscription_id: Option<SubscriptionId>,
    pub subscription_state: SubscriptionState,
}

impl Account {
    /// Whether the account has a live subscription.
    ///
    /// Both a subscription ID and a state in `{active, trialing}` are required.
    #[must_use]
    pub const fn has_active_subscription(&self) -> bool {
        self.active_subscription_id.is_some() && self.subscription_state.grants_access()
    }
}

/// Where the account lookup for the signed-in identity stands.
///
/// `Absent` ("no shop record") and `Present` with `approved == false` are
/// distinct states and must never be conflated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AccountLookup {
    /// Not fetched yet for the current identity.
    #[default]
    Pending,
    /// The backend has no shop record for this identity.
    Absent,
    /// The backend returned a shop record.
    Present(Account),
}

impl AccountLookup {
    /// The account, if one is present.
    #[must_use]
    pub const fn account(&self) -> Option<&Account> {
        match self {
            Self::Present(account) => Some(account),
            Self::Pending | Self::Absent => None,
        }
    }

    /// Whether the lookup has completed (either way).
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl From<Option<Account>> for AccountLookup {
    fn from(account: Option<Account>) -> Self {
        account.map_or(Self::Absent, Self::Present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(sub: Option<&str>, state: SubscriptionState) -> Account {
        Account {
            shop_id: ShopId::new("shop_1"),
            shop_name: "Corner Cafe".to_string(),
            registered: true,
            approved: true,
            active_subscription_id: sub.map(SubscriptionId::new),
            subscription_state: state,
        }
    }

    #[test]
    fn test_active_subscription_requires_id_and_state() {
        assert!(account(Some("sub_1"), SubscriptionState::Active).has_active_subscription());
        assert!(account(Some("sub_1"), SubscriptionState::Trialing).has_active_subscription());
        assert!(!account(None, SubscriptionState::Active).has_active_subscription());
        assert!(!account(Some("sub_1"), SubscriptionState::PastDue).has_active_subscription());
    }

    #[test]
    fn test_lookup_from_option() {
        assert_eq!(AccountLookup::from(None), AccountLookup::Absent);
        let present = AccountLookup::from(Some(account(None, SubscriptionState::None)));
        assert!(present.account().is_some());
        assert!(present.is_resolved());
        assert!(!AccountLookup::Pending.is_resolved());
    }
}
