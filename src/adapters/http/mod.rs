//! HTTP adapters - the inbound webhook surface.

pub mod webhooks;

pub use webhooks::{webhook_routes, WebhookAppState};
