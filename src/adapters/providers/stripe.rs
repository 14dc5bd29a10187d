//! Stripe webhook normalizer.
//!
//! Signature scheme: `Stripe-Signature: t=<unix>,v1=<hex hmac>` where the
//! MAC covers `"<t>.<body>"`. The signed timestamp is checked against the
//! shared acceptance window before any comparison.
//!
//! Taxonomy mapping:
//!
//! | Stripe type                     | Canonical kind                      |
//! |---------------------------------|-------------------------------------|
//! | `invoice.paid`                  | PaymentSucceeded                    |
//! | `invoice.payment_failed`        | PaymentFailed                       |
//! | `customer.subscription.updated` | per subscription status (see below) |
//! | `customer.subscription.deleted` | SubscriptionCanceled                |
//! | `charge.refunded`               | RefundIssued                        |
//! | `charge.dispute.created`        | ChargebackOpened                    |
//! | `charge.dispute.closed`         | ChargebackClosed                    |
//!
//! `checkout.session.completed` is deliberately unmapped: the
//! `invoice.paid` that follows carries the price and period data the
//! ledger needs, so mapping both would double-signal one payment.

use http::HeaderMap;
use secrecy::SecretString;
use serde::Deserialize;

use crate::domain::foundation::Timestamp;
use crate::domain::provider::{CanonicalEventKind, NormalizedEvent, Provider, WebhookError};

use super::verify::{constant_time_eq, hmac_sha256, validate_timestamp};
use super::WebhookNormalizer;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Parsed `Stripe-Signature` header.
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: i64,
    v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses `t=<unix>,v1=<hex>[,…]`, ignoring unknown schemes.
    fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| WebhookError::malformed("signature header part without '='"))?;
            match key {
                "t" => {
                    timestamp = Some(
                        value
                            .parse()
                            .map_err(|_| WebhookError::malformed("invalid signature timestamp"))?,
                    );
                }
                "v1" => {
                    v1_signature = Some(
                        hex::decode(value)
                            .map_err(|_| WebhookError::malformed("invalid v1 signature hex"))?,
                    );
                }
                // Unknown schemes are skipped for forward compatibility.
                _ => {}
            }
        }

        Ok(Self {
            timestamp: timestamp
                .ok_or_else(|| WebhookError::malformed("signature header missing timestamp"))?,
            v1_signature: v1_signature
                .ok_or_else(|| WebhookError::malformed("signature header missing v1"))?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeData,
}

#[derive(Debug, Deserialize)]
struct StripeData {
    object: serde_json::Value,
}

/// Verifies and normalizes Stripe webhooks.
pub struct StripeNormalizer {
    signing_secret: SecretString,
}

impl StripeNormalizer {
    pub fn new(signing_secret: SecretString) -> Self {
        Self { signing_secret }
    }

    fn verify(&self, headers: &HeaderMap, payload: &[u8]) -> Result<(), WebhookError> {
        let header = headers
            .get(SIGNATURE_HEADER)
            .ok_or(WebhookError::MissingSignature)?
            .to_str()
            .map_err(|_| WebhookError::malformed("non-ascii signature header"))?;
        let parsed = SignatureHeader::parse(header)?;

        validate_timestamp(parsed.timestamp, Timestamp::now().as_unix_secs())?;

        let mut signed = parsed.timestamp.to_string().into_bytes();
        signed.push(b'.');
        signed.extend_from_slice(payload);

        let expected = hmac_sha256(&self.signing_secret, &signed);
        if !constant_time_eq(&expected, &parsed.v1_signature) {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    fn normalize(&self, envelope: StripeEnvelope) -> Option<NormalizedEvent> {
        let object = &envelope.data.object;

        let kind = match envelope.event_type.as_str() {
            "invoice.paid" => CanonicalEventKind::PaymentSucceeded,
            "invoice.payment_failed" => CanonicalEventKind::PaymentFailed,
            "customer.subscription.updated" => match object.get("status").and_then(|s| s.as_str())
            {
                Some("active") | Some("trialing") => CanonicalEventKind::SubscriptionActive,
                Some("past_due") => CanonicalEventKind::SubscriptionPastDue,
                Some("canceled") | Some("unpaid") => CanonicalEventKind::SubscriptionCanceled,
                _ => return None,
            },
            "customer.subscription.deleted" => CanonicalEventKind::SubscriptionCanceled,
            "charge.refunded" => CanonicalEventKind::RefundIssued,
            "charge.dispute.created" => CanonicalEventKind::ChargebackOpened,
            "charge.dispute.closed" => CanonicalEventKind::ChargebackClosed,
            _ => return None,
        };

        let mut event = NormalizedEvent::new(Provider::Stripe, envelope.id, kind);

        // Invoices point at their subscription; other objects are the
        // correlation target themselves.
        event.object_id = object
            .get("subscription")
            .and_then(|s| s.as_str())
            .or_else(|| object.get("id").and_then(|s| s.as_str()))
            .map(String::from);

        event.customer_id = object
            .get("customer")
            .and_then(|c| c.as_str())
            .map(String::from);

        event.price_ids = extract_price_ids(object);

        event.occurred_at = object
            .get("created")
            .and_then(|c| c.as_i64())
            .and_then(Timestamp::from_unix_secs);

        event.period_end = extract_period_end(object);

        Some(event)
    }
}

/// Price ids live under `lines.data[].price.id` on invoices and
/// `items.data[].price.id` on subscriptions.
fn extract_price_ids(object: &serde_json::Value) -> Vec<String> {
    let lines = object
        .get("lines")
        .or_else(|| object.get("items"))
        .and_then(|l| l.get("data"))
        .and_then(|d| d.as_array());

    match lines {
        Some(items) => items
            .iter()
            .filter_map(|item| item.get("price")?.get("id")?.as_str())
            .map(String::from)
            .collect(),
        None => Vec::new(),
    }
}

/// Period end lives at `current_period_end` on subscriptions and under
/// `lines.data[0].period.end` on invoices.
fn extract_period_end(object: &serde_json::Value) -> Option<Timestamp> {
    if let Some(end) = object.get("current_period_end").and_then(|e| e.as_i64()) {
        return Timestamp::from_unix_secs(end);
    }
    let end = object
        .get("lines")?
        .get("data")?
        .as_array()?
        .first()?
        .get("period")?
        .get("end")?
        .as_i64()?;
    Timestamp::from_unix_secs(end)
}

impl WebhookNormalizer for StripeNormalizer {
    fn provider(&self) -> Provider {
        Provider::Stripe
    }

    fn verify_and_normalize(
        &self,
        headers: &HeaderMap,
        payload: &[u8],
    ) -> Result<Option<NormalizedEvent>, WebhookError> {
        self.verify(headers, payload)?;
        let envelope: StripeEnvelope = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::malformed(e.to_string()))?;
        Ok(self.normalize(envelope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "whsec_stripe_test";

    fn normalizer() -> StripeNormalizer {
        StripeNormalizer::new(SecretString::new(TEST_SECRET.to_string()))
    }

    fn sign(payload: &str, timestamp: i64) -> HeaderMap {
        let signed = format!("{timestamp}.{payload}");
        let mac = hmac_sha256(&SecretString::new(TEST_SECRET.to_string()), signed.as_bytes());
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            format!("t={timestamp},v1={}", hex::encode(mac)).parse().unwrap(),
        );
        headers
    }

    fn now() -> i64 {
        Timestamp::now().as_unix_secs()
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Header Parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_header_and_ignores_unknown_schemes() {
        let sig = "a".repeat(64);
        let header = SignatureHeader::parse(&format!("t=1700000000,v1={sig},v0=legacy")).unwrap();
        assert_eq!(header.timestamp, 1_700_000_000);
        assert_eq!(header.v1_signature.len(), 32);
    }

    #[test]
    fn rejects_header_missing_timestamp_or_v1() {
        let sig = "a".repeat(64);
        assert!(SignatureHeader::parse(&format!("v1={sig}")).is_err());
        assert!(SignatureHeader::parse("t=1700000000").is_err());
        assert!(SignatureHeader::parse("t=nope,v1=zz").is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Verification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_valid_signature() {
        let payload = r#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#;
        let headers = sign(payload, now());

        let result = normalizer().verify_and_normalize(&headers, payload.as_bytes());
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_missing_header() {
        let result = normalizer().verify_and_normalize(&HeaderMap::new(), b"{}");
        assert_eq!(result, Err(WebhookError::MissingSignature));
    }

    #[test]
    fn rejects_tampered_payload() {
        let headers = sign(r#"{"id":"evt_1"}"#, now());
        let result = normalizer().verify_and_normalize(&headers, br#"{"id":"evt_2"}"#);
        assert_eq!(result, Err(WebhookError::InvalidSignature));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = r#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#;
        let headers = sign(payload, now() - 600);
        let result = normalizer().verify_and_normalize(&headers, payload.as_bytes());
        assert_eq!(result, Err(WebhookError::StaleTimestamp));
    }

    #[test]
    fn rejects_future_timestamp_beyond_skew() {
        let payload = r#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#;
        let headers = sign(payload, now() + 120);
        let result = normalizer().verify_and_normalize(&headers, payload.as_bytes());
        assert_eq!(result, Err(WebhookError::FutureTimestamp));
    }

    // ══════════════════════════════════════════════════════════════
    // Normalization
    // ══════════════════════════════════════════════════════════════

    fn normalize(payload: serde_json::Value) -> Option<NormalizedEvent> {
        let text = payload.to_string();
        let headers = sign(&text, now());
        normalizer()
            .verify_and_normalize(&headers, text.as_bytes())
            .unwrap()
    }

    #[test]
    fn invoice_paid_maps_to_payment_succeeded() {
        let event = normalize(serde_json::json!({
            "id": "evt_inv",
            "type": "invoice.paid",
            "data": {"object": {
                "id": "in_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "created": 1_700_000_000,
                "lines": {"data": [
                    {"price": {"id": "price_gold"}, "period": {"end": 1_702_600_000}}
                ]}
            }}
        }))
        .unwrap();

        assert_eq!(event.kind, CanonicalEventKind::PaymentSucceeded);
        assert_eq!(event.object_id.as_deref(), Some("sub_1"));
        assert_eq!(event.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(event.price_ids, vec!["price_gold".to_string()]);
        assert_eq!(event.period_end, Timestamp::from_unix_secs(1_702_600_000));
    }

    #[test]
    fn subscription_updated_maps_by_status() {
        for (status, kind) in [
            ("active", CanonicalEventKind::SubscriptionActive),
            ("past_due", CanonicalEventKind::SubscriptionPastDue),
            ("canceled", CanonicalEventKind::SubscriptionCanceled),
        ] {
            let event = normalize(serde_json::json!({
                "id": "evt_sub",
                "type": "customer.subscription.updated",
                "data": {"object": {
                    "id": "sub_1",
                    "status": status,
                    "customer": "cus_1",
                    "current_period_end": 1_702_600_000,
                    "items": {"data": [{"price": {"id": "price_gold"}}]}
                }}
            }))
            .unwrap();

            assert_eq!(event.kind, kind, "status {status}");
            assert_eq!(event.object_id.as_deref(), Some("sub_1"));
        }
    }

    #[test]
    fn dispute_events_map_to_chargebacks() {
        let opened = normalize(serde_json::json!({
            "id": "evt_dp1",
            "type": "charge.dispute.created",
            "data": {"object": {"id": "dp_1", "charge": "ch_1"}}
        }))
        .unwrap();
        assert_eq!(opened.kind, CanonicalEventKind::ChargebackOpened);

        let closed = normalize(serde_json::json!({
            "id": "evt_dp2",
            "type": "charge.dispute.closed",
            "data": {"object": {"id": "dp_1"}}
        }))
        .unwrap();
        assert_eq!(closed.kind, CanonicalEventKind::ChargebackClosed);
    }

    #[test]
    fn unknown_event_type_is_dropped_not_rejected() {
        let result = normalize(serde_json::json!({
            "id": "evt_x",
            "type": "checkout.session.completed",
            "data": {"object": {}}
        }));
        assert!(result.is_none());
    }

    #[test]
    fn malformed_json_is_rejected_after_verification() {
        let payload = "not json";
        let headers = sign(payload, now());
        let result = normalizer().verify_and_normalize(&headers, payload.as_bytes());
        assert!(matches!(result, Err(WebhookError::Malformed(_))));
    }
}
