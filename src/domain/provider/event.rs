//! Canonical payment events.
//!
//! Each processor speaks its own taxonomy; normalizers map all of them
//! onto the single canonical vocabulary defined here. Everything past the
//! webhook boundary reasons about `NormalizedEvent` only.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Supported payment processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Stripe,
    Coinbase,
    Square,
}

impl Provider {
    /// Returns the lowercase wire name for this provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Stripe => "stripe",
            Provider::Coinbase => "coinbase",
            Provider::Square => "square",
        }
    }

    /// Parses a provider from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stripe" => Some(Provider::Stripe),
            "coinbase" => Some(Provider::Coinbase),
            "square" => Some(Provider::Square),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical payment-lifecycle event kinds.
///
/// The closed set every processor taxonomy is mapped onto. Processor
/// event types with no mapping are acknowledged and dropped at the
/// webhook boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalEventKind {
    PaymentSucceeded,
    PaymentFailed,
    SubscriptionActive,
    SubscriptionPastDue,
    SubscriptionCanceled,
    RefundIssued,
    ChargebackOpened,
    ChargebackClosed,
}

impl CanonicalEventKind {
    /// Returns the snake_case wire name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalEventKind::PaymentSucceeded => "payment_succeeded",
            CanonicalEventKind::PaymentFailed => "payment_failed",
            CanonicalEventKind::SubscriptionActive => "subscription_active",
            CanonicalEventKind::SubscriptionPastDue => "subscription_past_due",
            CanonicalEventKind::SubscriptionCanceled => "subscription_canceled",
            CanonicalEventKind::RefundIssued => "refund_issued",
            CanonicalEventKind::ChargebackOpened => "chargeback_opened",
            CanonicalEventKind::ChargebackClosed => "chargeback_closed",
        }
    }

    /// Parses a kind from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "payment_succeeded" => Some(CanonicalEventKind::PaymentSucceeded),
            "payment_failed" => Some(CanonicalEventKind::PaymentFailed),
            "subscription_active" => Some(CanonicalEventKind::SubscriptionActive),
            "subscription_past_due" => Some(CanonicalEventKind::SubscriptionPastDue),
            "subscription_canceled" => Some(CanonicalEventKind::SubscriptionCanceled),
            "refund_issued" => Some(CanonicalEventKind::RefundIssued),
            "chargeback_opened" => Some(CanonicalEventKind::ChargebackOpened),
            "chargeback_closed" => Some(CanonicalEventKind::ChargebackClosed),
        _ => None,
        }
    }
}

impl std::fmt::Display for CanonicalEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One payment occurrence, normalized out of a processor webhook.
///
/// Correlation fields are optional because processors attach them
/// inconsistently; reconciliation resolves what it can and records a
/// readable failure for the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Originating processor.
    pub provider: Provider,

    /// Processor-assigned event id; the dedup key together with `provider`.
    pub event_id: String,

    /// Canonical event kind.
    pub kind: CanonicalEventKind,

    /// Processor object the event is about (charge, subscription, order).
    pub object_id: Option<String>,

    /// Processor customer id, correlated to a subject via customer links.
    pub customer_id: Option<String>,

    /// Processor price/product references, correlated to tiers.
    pub price_ids: Vec<String>,

    /// When the processor says the occurrence happened.
    pub occurred_at: Option<Timestamp>,

    /// Subscription period end, when the processor reports one.
    pub period_end: Option<Timestamp>,
}

impl NormalizedEvent {
    /// Creates an event with only the required fields set.
    pub fn new(provider: Provider, event_id: impl Into<String>, kind: CanonicalEventKind) -> Self {
        Self {
            provider,
            event_id: event_id.into(),
            kind,
            object_id: None,
            customer_id: None,
            price_ids: Vec::new(),
            occurred_at: None,
            period_end: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips_through_wire_name() {
        for provider in [Provider::Stripe, Provider::Coinbase, Provider::Square] {
            assert_eq!(Provider::parse(provider.as_str()), Some(provider));
        }
    }

    #[test]
    fn provider_parse_rejects_unknown() {
        assert_eq!(Provider::parse("paypal"), None);
    }

    #[test]
    fn kind_round_trips_through_wire_name() {
        for kind in [
            CanonicalEventKind::PaymentSucceeded,
            CanonicalEventKind::PaymentFailed,
            CanonicalEventKind::SubscriptionActive,
            CanonicalEventKind::SubscriptionPastDue,
            CanonicalEventKind::SubscriptionCanceled,
            CanonicalEventKind::RefundIssued,
            CanonicalEventKind::ChargebackOpened,
            CanonicalEventKind::ChargebackClosed,
        ] {
            assert_eq!(CanonicalEventKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&CanonicalEventKind::SubscriptionPastDue).unwrap();
        assert_eq!(json, "\"subscription_past_due\"");
    }

    #[test]
    fn new_event_has_empty_correlation_fields() {
        let event = NormalizedEvent::new(
            Provider::Stripe,
            "evt_123",
            CanonicalEventKind::PaymentSucceeded,
        );

        assert!(event.object_id.is_none());
        assert!(event.customer_id.is_none());
        assert!(event.price_ids.is_empty());
        assert!(event.period_end.is_none());
    }
}
