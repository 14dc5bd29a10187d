//! Provider domain: canonical payment events and webhook errors.
//!
//! # Module Structure
//!
//! - `event` - Provider, CanonicalEventKind, NormalizedEvent
//! - `errors` - WebhookError

mod errors;
mod event;

pub use errors::WebhookError;
pub use event::{CanonicalEventKind, NormalizedEvent, Provider};
