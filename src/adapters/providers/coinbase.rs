//! Coinbase Commerce webhook normalizer.
//!
//! Signature scheme: `X-CC-Webhook-Signature` carries a hex HMAC-SHA256 of
//! the raw body. No signed timestamp exists in this scheme, so replay
//! protection rests on event-id deduplication downstream.
//!
//! Coinbase charges are one-time payments; the checkout id is the tier
//! reference and the subject correlation comes from merchant-set metadata
//! written at checkout creation.

use http::HeaderMap;
use secrecy::SecretString;
use serde::Deserialize;

use crate::domain::foundation::Timestamp;
use crate::domain::provider::{CanonicalEventKind, NormalizedEvent, Provider, WebhookError};

use super::verify::{constant_time_eq, hmac_sha256};
use super::WebhookNormalizer;

const SIGNATURE_HEADER: &str = "x-cc-webhook-signature";

#[derive(Debug, Deserialize)]
struct CoinbaseEnvelope {
    event: CoinbaseEvent,
}

#[derive(Debug, Deserialize)]
struct CoinbaseEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: serde_json::Value,
}

/// Verifies and normalizes Coinbase Commerce webhooks.
pub struct CoinbaseNormalizer {
    shared_secret: SecretString,
}

impl CoinbaseNormalizer {
    pub fn new(shared_secret: SecretString) -> Self {
        Self { shared_secret }
    }

    fn verify(&self, headers: &HeaderMap, payload: &[u8]) -> Result<(), WebhookError> {
        let header = headers
            .get(SIGNATURE_HEADER)
            .ok_or(WebhookError::MissingSignature)?
            .to_str()
            .map_err(|_| WebhookError::malformed("non-ascii signature header"))?;
        let provided =
            hex::decode(header).map_err(|_| WebhookError::malformed("invalid signature hex"))?;

        let expected = hmac_sha256(&self.shared_secret, payload);
        if !constant_time_eq(&expected, &provided) {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    fn normalize(&self, event: CoinbaseEvent) -> Option<NormalizedEvent> {
        let kind = match event.event_type.as_str() {
            "charge:confirmed" => CanonicalEventKind::PaymentSucceeded,
            "charge:failed" => CanonicalEventKind::PaymentFailed,
            _ => return None,
        };

        let data = &event.data;
        let mut normalized = NormalizedEvent::new(Provider::Coinbase, event.id, kind);

        normalized.object_id = data.get("id").and_then(|v| v.as_str()).map(String::from);

        // Checkout-created charges are correlated back to a subject via
        // metadata stamped at checkout creation.
        normalized.customer_id = data
            .get("metadata")
            .and_then(|m| m.get("customer_id"))
            .and_then(|v| v.as_str())
            .map(String::from);

        normalized.price_ids = data
            .get("checkout")
            .and_then(|c| c.get("id"))
            .and_then(|v| v.as_str())
            .map(|id| vec![id.to_string()])
            .unwrap_or_default();

        normalized.occurred_at = data
            .get("created_at")
            .and_then(|v| v.as_str())
            .and_then(parse_rfc3339);

        Some(normalized)
    }
}

fn parse_rfc3339(s: &str) -> Option<Timestamp> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| Timestamp::from_datetime(dt.with_timezone(&chrono::Utc)))
}

impl WebhookNormalizer for CoinbaseNormalizer {
    fn provider(&self) -> Provider {
        Provider::Coinbase
    }

    fn verify_and_normalize(
        &self,
        headers: &HeaderMap,
        payload: &[u8],
    ) -> Result<Option<NormalizedEvent>, WebhookError> {
        self.verify(headers, payload)?;
        let envelope: CoinbaseEnvelope = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::malformed(e.to_string()))?;
        Ok(self.normalize(envelope.event))
    }
}
