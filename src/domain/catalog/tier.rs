//! Access tiers and their entitlement policies.
//!
//! A tier binds a set of platform roles to a purchase: either a recurring
//! subscription or a one-time payment. Processor cross-references identify
//! which incoming payment events belong to which tier, and the policy kind
//! constrains which references are legal.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GroupId, RoleId, TierId, ValidationError};
use crate::domain::provider::Provider;

/// How a purchase of this tier translates into a validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntitlementPolicy {
    /// Recurring subscription; validity tracks the processor's period end
    /// plus a grace window for late payment recovery.
    Subscription { grace_days: u32 },

    /// Single payment; `duration_days: None` means lifetime access.
    OneTime { duration_days: Option<u32> },
}

impl EntitlementPolicy {
    /// True for the subscription variant.
    pub fn is_subscription(&self) -> bool {
        matches!(self, EntitlementPolicy::Subscription { .. })
    }
}

/// Per-processor references correlating payment events to a tier.
///
/// Subscription references (`stripe_price_ids`) and one-time references
/// (`coinbase_checkout_id`, `square_item_ids`) are mutually exclusive with
/// the opposite policy kind; `Tier::new` enforces this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorRefs {
    /// Stripe price ids (subscription tiers).
    #[serde(default)]
    pub stripe_price_ids: Vec<String>,

    /// Coinbase Commerce checkout id (one-time tiers).
    #[serde(default)]
    pub coinbase_checkout_id: Option<String>,

    /// Square catalog item ids (one-time tiers).
    #[serde(default)]
    pub square_item_ids: Vec<String>,
}

impl ProcessorRefs {
    fn has_subscription_refs(&self) -> bool {
        !self.stripe_price_ids.is_empty()
    }

    fn has_one_time_refs(&self) -> bool {
        self.coinbase_checkout_id.is_some() || !self.square_item_ids.is_empty()
    }

    /// True when any reference matches the given processor price/product id.
    pub fn matches(&self, provider: Provider, reference: &str) -> bool {
        match provider {
            Provider::Stripe => self.stripe_price_ids.iter().any(|p| p == reference),
            Provider::Coinbase => self.coinbase_checkout_id.as_deref() == Some(reference),
            Provider::Square => self.square_item_ids.iter().any(|p| p == reference),
        }
    }
}

/// An access level within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: TierId,
    pub group_id: GroupId,
    pub name: String,

    /// Platform roles granted by this tier. Never empty.
    pub role_ids: Vec<RoleId>,

    pub policy: EntitlementPolicy,
    pub refs: ProcessorRefs,
}

impl Tier {
    /// Creates a tier, validating the role set and the policy/reference
    /// compatibility invariant.
    pub fn new(
        id: TierId,
        group_id: GroupId,
        name: impl Into<String>,
        role_ids: Vec<RoleId>,
        policy: EntitlementPolicy,
        refs: ProcessorRefs,
    ) -> Result<Self, ValidationError> {
        if role_ids.is_empty() {
            return Err(ValidationError::empty_field("role_ids"));
        }

        match policy {
            EntitlementPolicy::Subscription { .. } if refs.has_one_time_refs() => {
                return Err(ValidationError::invalid_format(
                    "refs",
                    "subscription tier cannot carry one-time processor references",
                ));
            }
            EntitlementPolicy::OneTime { .. } if refs.has_subscription_refs() => {
                return Err(ValidationError::invalid_format(
                    "refs",
                    "one-time tier cannot carry subscription processor references",
                ));
            }
            _ => {}
        }

        Ok(Self {
            id,
            group_id,
            name: name.into(),
            role_ids,
            policy,
            refs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_id() -> GroupId {
        GroupId::new("812345678901234567").unwrap()
    }

    fn role(id: &str) -> RoleId {
        RoleId::new(id).unwrap()
    }

    #[test]
    fn subscription_tier_with_price_ids_is_valid() {
        let tier = Tier::new(
            TierId::new(),
            group_id(),
            "Gold",
            vec![role("900000000000000001")],
            EntitlementPolicy::Subscription { grace_days: 3 },
            ProcessorRefs {
                stripe_price_ids: vec!["price_gold_monthly".into()],
                ..Default::default()
            },
        );

        assert!(tier.is_ok());
    }

    #[test]
    fn subscription_tier_rejects_one_time_refs() {
        let tier = Tier::new(
            TierId::new(),
            group_id(),
            "Gold",
            vec![role("900000000000000001")],
            EntitlementPolicy::Subscription { grace_days: 3 },
            ProcessorRefs {
                coinbase_checkout_id: Some("cb-checkout-1".into()),
                ..Default::default()
            },
        );

        assert!(tier.is_err());
    }

    #[test]
    fn one_time_tier_rejects_subscription_refs() {
        let tier = Tier::new(
            TierId::new(),
            group_id(),
            "Lifetime",
            vec![role("900000000000000002")],
            EntitlementPolicy::OneTime { duration_days: None },
            ProcessorRefs {
                stripe_price_ids: vec!["price_lifetime".into()],
                ..Default::default()
            },
        );

        assert!(tier.is_err());
    }

    #[test]
    fn tier_requires_at_least_one_role() {
        let tier = Tier::new(
            TierId::new(),
            group_id(),
            "Empty",
            vec![],
            EntitlementPolicy::OneTime { duration_days: Some(30) },
            ProcessorRefs::default(),
        );

        assert!(tier.is_err());
    }

    #[test]
    fn refs_match_by_provider() {
        let refs = ProcessorRefs {
            stripe_price_ids: vec!["price_a".into()],
            coinbase_checkout_id: Some("cb_1".into()),
            square_item_ids: vec!["sq_item_1".into()],
        };

        assert!(refs.matches(Provider::Stripe, "price_a"));
        assert!(refs.matches(Provider::Coinbase, "cb_1"));
        assert!(refs.matches(Provider::Square, "sq_item_1"));
        assert!(!refs.matches(Provider::Stripe, "cb_1"));
        assert!(!refs.matches(Provider::Square, "price_a"));
    }
}
