//! Wire types for the webhook surface.
//!
//! Processors ignore response bodies on success; the error body exists for
//! operators replaying deliveries by hand.

use serde::Serialize;

/// Error payload returned on 4xx/5xx.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
