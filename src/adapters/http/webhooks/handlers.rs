//! HTTP handlers for processor webhook deliveries.
//!
//! Response contract, shared by all three processors:
//!
//! - 200: accepted, whether applied, deliberately ignored, or a duplicate.
//!   Processors retry every non-2xx, so "authentic but no-op" must still
//!   acknowledge.
//! - 400: unauthenticated or malformed. Nothing is recorded.
//! - 405: wrong method on a webhook path (axum method routing).
//! - 500: the processor has no signing secret configured, or the event
//!   could not be recorded. Processors retry these, which is wanted.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::adapters::providers::WebhookNormalizer;
use crate::application::handlers::{IngestOutcome, IngestProviderEventHandler};
use crate::domain::provider::Provider;

use super::dto::ErrorResponse;

/// Shared state for the webhook routes.
///
/// A processor without a registered normalizer (no signing secret in the
/// config) answers 500 so deliveries are retried once it is configured.
#[derive(Clone)]
pub struct WebhookAppState {
    ingest: Arc<IngestProviderEventHandler>,
    stripe: Option<Arc<dyn WebhookNormalizer>>,
    coinbase: Option<Arc<dyn WebhookNormalizer>>,
    square: Option<Arc<dyn WebhookNormalizer>>,
}

impl WebhookAppState {
    pub fn new(ingest: Arc<IngestProviderEventHandler>) -> Self {
        Self {
            ingest,
            stripe: None,
            coinbase: None,
            square: None,
        }
    }

    /// Registers a normalizer under the processor it speaks for.
    pub fn with_normalizer(mut self, normalizer: Arc<dyn WebhookNormalizer>) -> Self {
        match normalizer.provider() {
            Provider::Stripe => self.stripe = Some(normalizer),
            Provider::Coinbase => self.coinbase = Some(normalizer),
            Provider::Square => self.square = Some(normalizer),
        }
        self
    }

    fn normalizer(&self, provider: Provider) -> Option<&Arc<dyn WebhookNormalizer>> {
        match provider {
            Provider::Stripe => self.stripe.as_ref(),
            Provider::Coinbase => self.coinbase.as_ref(),
            Provider::Square => self.square.as_ref(),
        }
    }
}

/// POST /webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    ingest_webhook(&state, Provider::Stripe, &headers, &body).await
}

/// POST /webhooks/coinbase
pub async fn coinbase_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    ingest_webhook(&state, Provider::Coinbase, &headers, &body).await
}

/// POST /webhooks/square
pub async fn square_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    ingest_webhook(&state, Provider::Square, &headers, &body).await
}

async fn ingest_webhook(
    state: &WebhookAppState,
    provider: Provider,
    headers: &HeaderMap,
    body: &Bytes,
) -> Response {
    let Some(normalizer) = state.normalizer(provider) else {
        tracing::error!(%provider, "webhook received for an unconfigured processor");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "PROCESSOR_NOT_CONFIGURED",
                format!("no signing secret configured for {provider}"),
            )),
        )
            .into_response();
    };

    let event = match normalizer.verify_and_normalize(headers, body) {
        Ok(Some(event)) => event,
        // Authentic but unmapped event type: acknowledge and drop.
        Ok(None) => return StatusCode::OK.into_response(),
        Err(e) if e.is_authentication_failure() => {
            tracing::warn!(%provider, error = %e, "webhook failed authentication");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("WEBHOOK_UNAUTHENTICATED", e.to_string())),
            )
                .into_response();
        }
        Err(e) => {
            tracing::debug!(%provider, error = %e, "webhook rejected as malformed");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("WEBHOOK_MALFORMED", e.to_string())),
            )
                .into_response();
        }
    };

    // Raw payload snapshot for the event ledger. Verification already
    // guaranteed the body parses.
    let payload = serde_json::from_slice(body).unwrap_or(serde_json::Value::Null);

    match state.ingest.handle(event, payload).await {
        Ok(outcome) => {
            if let IngestOutcome::Unmatched { reason } = &outcome {
                tracing::warn!(%provider, reason = %reason, "webhook stored but uncorrelated");
            }
            StatusCode::OK.into_response()
        }
        Err(e) => {
            tracing::error!(%provider, error = %e, "webhook ingestion failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "INGESTION_FAILED",
                    "event could not be recorded",
                )),
            )
                .into_response()
        }
    }
}
