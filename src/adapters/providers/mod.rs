//! Per-processor webhook adapters.
//!
//! Each processor gets one normalizer implementing [`WebhookNormalizer`]:
//! verify the signature (fail closed, nothing recorded on failure), then
//! map the processor's taxonomy onto the canonical event vocabulary.
//!
//! # Module Structure
//!
//! - `verify` - Shared HMAC and timestamp-window primitives
//! - `stripe` - Timestamped `t=…,v1=…` scheme, subscription taxonomy
//! - `coinbase` - Raw body digest scheme, crypto charge taxonomy
//! - `square` - Header-fallback scheme, payment/refund/dispute taxonomy

mod coinbase;
mod square;
mod stripe;
mod verify;

use http::HeaderMap;

use crate::domain::provider::{NormalizedEvent, Provider, WebhookError};

pub use coinbase::CoinbaseNormalizer;
pub use square::SquareNormalizer;
pub use stripe::StripeNormalizer;

/// Capability shared by every processor adapter.
pub trait WebhookNormalizer: Send + Sync {
    /// The processor this normalizer speaks for.
    fn provider(&self) -> Provider;

    /// Verifies the request signature and maps the payload to a canonical
    /// event.
    ///
    /// `Ok(None)` means the signature checked out but the event type has
    /// no canonical mapping; the caller acknowledges and drops it, since
    /// processors retry non-2xx responses indefinitely.
    fn verify_and_normalize(
        &self,
        headers: &HeaderMap,
        payload: &[u8],
    ) -> Result<Option<NormalizedEvent>, WebhookError>;
}
