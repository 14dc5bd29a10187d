//! Square webhook normalizer.
//!
//! Signature scheme: `x-square-hmacsha256-signature` carries an HMAC-SHA256
//! of the raw body, base64-encoded; deployments migrated from the legacy
//! header still send `x-square-signature`, which is accepted as a fallback.
//! Either header may carry hex or base64, so both encodings are decoded
//! before the constant-time comparison.
//!
//! Square payments are one-time; tier correlation uses the order line
//! items' catalog object ids.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use http::HeaderMap;
use secrecy::SecretString;
use serde::Deserialize;

use crate::domain::foundation::Timestamp;
use crate::domain::provider::{CanonicalEventKind, NormalizedEvent, Provider, WebhookError};

use super::verify::{constant_time_eq, hmac_sha256};
use super::WebhookNormalizer;

const SIGNATURE_HEADER: &str = "x-square-hmacsha256-signature";
const LEGACY_SIGNATURE_HEADER: &str = "x-square-signature";

#[derive(Debug, Deserialize)]
struct SquareEnvelope {
    event_id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: SquareData,
}

#[derive(Debug, Deserialize)]
struct SquareData {
    object: serde_json::Value,
}

/// Verifies and normalizes Square webhooks.
pub struct SquareNormalizer {
    signature_key: SecretString,
}

impl SquareNormalizer {
    pub fn new(signature_key: SecretString) -> Self {
        Self { signature_key }
    }

    fn verify(&self, headers: &HeaderMap, payload: &[u8]) -> Result<(), WebhookError> {
        let header = headers
            .get(SIGNATURE_HEADER)
            .or_else(|| headers.get(LEGACY_SIGNATURE_HEADER))
            .ok_or(WebhookError::MissingSignature)?
            .to_str()
            .map_err(|_| WebhookError::malformed("non-ascii signature header"))?;

        let provided = decode_signature(header)?;
        let expected = hmac_sha256(&self.signature_key, payload);
        if !constant_time_eq(&expected, &provided) {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    fn normalize(&self, envelope: SquareEnvelope) -> Option<NormalizedEvent> {
        let object = &envelope.data.object;

        let (kind, inner) = match envelope.event_type.as_str() {
            "payment.created" | "payment.updated" => {
                let payment = object.get("payment")?;
                match payment.get("status").and_then(|s| s.as_str()) {
                    Some("COMPLETED") => (CanonicalEventKind::PaymentSucceeded, payment),
                    Some("FAILED") | Some("CANCELED") => {
                        (CanonicalEventKind::PaymentFailed, payment)
                    }
                    // APPROVED/PENDING precede a terminal status update.
                    _ => return None,
                }
            }
            "refund.updated" => {
                let refund = object.get("refund")?;
                match refund.get("status").and_then(|s| s.as_str()) {
                    Some("COMPLETED") => (CanonicalEventKind::RefundIssued, refund),
                    _ => return None,
                }
            }
            "dispute.created" => (CanonicalEventKind::ChargebackOpened, object.get("dispute")?),
            "dispute.state.updated" => {
                let dispute = object.get("dispute")?;
                match dispute.get("state").and_then(|s| s.as_str()) {
                    Some("WON") | Some("LOST") | Some("ACCEPTED") => {
                        (CanonicalEventKind::ChargebackClosed, dispute)
                    }
                    _ => return None,
                }
            }
            _ => return None,
        };

        let mut event = NormalizedEvent::new(Provider::Square, envelope.event_id, kind);

        event.object_id = inner.get("id").and_then(|v| v.as_str()).map(String::from);
        event.customer_id = inner
            .get("customer_id")
            .and_then(|v| v.as_str())
            .map(String::from);
        event.price_ids = extract_catalog_ids(inner);
        event.occurred_at = inner
            .get("created_at")
            .and_then(|v| v.as_str())
            .and_then(parse_rfc3339);

        Some(event)
    }
}

/// Accepts hex or base64; both appear in the wild depending on the
/// integration's age.
fn decode_signature(header: &str) -> Result<Vec<u8>, WebhookError> {
    if let Ok(bytes) = hex::decode(header) {
        return Ok(bytes);
    }
    BASE64
        .decode(header)
        .map_err(|_| WebhookError::malformed("signature is neither hex nor base64"))
}

/// Catalog ids live under the embedded order's line items.
fn extract_catalog_ids(payment: &serde_json::Value) -> Vec<String> {
    payment
        .get("order")
        .and_then(|o| o.get("line_items"))
        .and_then(|l| l.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("catalog_object_id")?.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_rfc3339(s: &str) -> Option<Timestamp> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| Timestamp::from_datetime(dt.with_timezone(&chrono::Utc)))
}

impl WebhookNormalizer for SquareNormalizer {
    fn provider(&self) -> Provider {
        Provider::Square
    }

    fn verify_and_normalize(
        &self,
        headers: &HeaderMap,
        payload: &[u8],
    ) -> Result<Option<NormalizedEvent>, WebhookError> {
        self.verify(headers, payload)?;
        let envelope: SquareEnvelope = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::malformed(e.to_string()))?;
        Ok(self.normalize(envelope))
    }
}
