//! Axum router for the webhook ingestion surface.
//!
//! One raw-body POST route per processor. Webhook routes carry no session
//! auth; authenticity comes from the signature verification inside each
//! normalizer.

use axum::routing::post;
use axum::Router;

use super::handlers::{coinbase_webhook, square_webhook, stripe_webhook, WebhookAppState};

/// Webhook routes, suitable for nesting under `/webhooks`.
///
/// # Routes
///
/// - `POST /stripe` - Stripe deliveries
/// - `POST /coinbase` - Coinbase Commerce deliveries
/// - `POST /square` - Square deliveries
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new()
        .route("/stripe", post(stripe_webhook))
        .route("/coinbase", post(coinbase_webhook))
        .route("/square", post(square_webhook))
}
