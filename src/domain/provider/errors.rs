//! Webhook ingestion errors.
//!
//! The boundary fails closed: any error here means nothing was recorded.

use thiserror::Error;

/// Errors raised while verifying and normalizing a processor webhook.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WebhookError {
    /// The expected signature header is absent.
    #[error("missing signature header")]
    MissingSignature,

    /// The signature did not match the payload.
    #[error("invalid signature")]
    InvalidSignature,

    /// The signed timestamp is older than the acceptance window.
    #[error("signature timestamp too old")]
    StaleTimestamp,

    /// The signed timestamp is further in the future than clock skew allows.
    #[error("signature timestamp in the future")]
    FutureTimestamp,

    /// The header or payload could not be parsed.
    #[error("malformed webhook: {0}")]
    Malformed(String),
}

impl WebhookError {
    /// Creates a malformed-payload error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        WebhookError::Malformed(reason.into())
    }

    /// True when the request failed authentication rather than parsing.
    ///
    /// Both classes map to HTTP 400, but authentication failures are
    /// logged at a higher severity since they may indicate forgery.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::InvalidSignature
                | WebhookError::StaleTimestamp
                | WebhookError::FutureTimestamp
        )
    }
}
