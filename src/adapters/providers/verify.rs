//! Shared signature verification primitives.
//!
//! All three processors sign with HMAC-SHA256 over the raw body (Stripe
//! prefixes a timestamp); the helpers here keep key handling and the
//! constant-time comparison in one place.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::provider::WebhookError;

/// Maximum accepted age for a signed timestamp (5 minutes).
pub const MAX_SIGNATURE_AGE_SECS: i64 = 300;

/// Maximum tolerated clock skew for future timestamps (1 minute).
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Computes HMAC-SHA256 of `message` under the processor secret.
pub fn hmac_sha256(secret: &SecretString, message: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Constant-time byte comparison. Length is checked first; length is not
/// secret.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Rejects signed timestamps outside the acceptance window.
pub fn validate_timestamp(timestamp: i64, now: i64) -> Result<(), WebhookError> {
    let age = now - timestamp;
    if age > MAX_SIGNATURE_AGE_SECS {
        return Err(WebhookError::StaleTimestamp);
    }
    if age < -MAX_CLOCK_SKEW_SECS {
        return Err(WebhookError::FutureTimestamp);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::new("whsec_test".to_string())
    }

    #[test]
    fn hmac_is_deterministic_per_key_and_message() {
        let a = hmac_sha256(&secret(), b"payload");
        let b = hmac_sha256(&secret(), b"payload");
        let c = hmac_sha256(&secret(), b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn comparison_rejects_length_mismatch() {
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn timestamp_window_boundaries() {
        let now = 1_700_000_000;
        assert!(validate_timestamp(now - MAX_SIGNATURE_AGE_SECS, now).is_ok());
        assert_eq!(
            validate_timestamp(now - MAX_SIGNATURE_AGE_SECS - 1, now),
            Err(WebhookError::StaleTimestamp)
        );
        assert!(validate_timestamp(now + MAX_CLOCK_SKEW_SECS, now).is_ok());
        assert_eq!(
            validate_timestamp(now + MAX_CLOCK_SKEW_SECS + 1, now),
            Err(WebhookError::FutureTimestamp)
        );
    }
}
