//! IngestProviderEventHandler - records a normalized event idempotently,
//! then reconciles first-time inserts.
//!
//! This is the `recordProviderEvent` surface exposed to webhook routes.
//! Duplicates short-circuit before reconciliation, which is what makes
//! processor delivery retries safe to accept unconditionally.

use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::provider::NormalizedEvent;
use crate::ports::ProviderEventStore;

use super::apply_provider_event::{ApplyOutcome, ApplyProviderEventHandler};

/// Terminal disposition of one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First delivery; the ledger changed.
    Applied,
    /// First delivery; authentic but deliberately without effect.
    Ignored { reason: String },
    /// First delivery; stored but could not be correlated. Recorded as
    /// failed for operator follow-up.
    Unmatched { reason: String },
    /// Redelivery of an already recorded event.
    Duplicate,
}

pub struct IngestProviderEventHandler {
    store: Arc<dyn ProviderEventStore>,
    apply: Arc<ApplyProviderEventHandler>,
}

impl IngestProviderEventHandler {
    pub fn new(store: Arc<dyn ProviderEventStore>, apply: Arc<ApplyProviderEventHandler>) -> Self {
        Self { store, apply }
    }

    pub async fn handle(
        &self,
        event: NormalizedEvent,
        payload: serde_json::Value,
    ) -> Result<IngestOutcome, DomainError> {
        let outcome = self.store.record(event.clone(), payload).await?;
        if !outcome.is_inserted() {
            tracing::debug!(
                provider = %event.provider,
                event_id = %event.event_id,
                "duplicate delivery acknowledged"
            );
            return Ok(IngestOutcome::Duplicate);
        }

        match self.apply.handle(&event).await {
            Ok(ApplyOutcome::Applied { grant_id }) => {
                self.store
                    .mark_processed(event.provider, &event.event_id)
                    .await?;
                tracing::info!(
                    provider = %event.provider,
                    event_id = %event.event_id,
                    kind = %event.kind,
                    grant_id = %grant_id,
                    "provider event applied"
                );
                Ok(IngestOutcome::Applied)
            }
            Ok(ApplyOutcome::Ignored { reason }) => {
                self.store
                    .mark_processed(event.provider, &event.event_id)
                    .await?;
                Ok(IngestOutcome::Ignored { reason })
            }
            Ok(ApplyOutcome::Unmatched { reason }) => {
                self.store
                    .mark_failed(event.provider, &event.event_id, &reason)
                    .await?;
                tracing::warn!(
                    provider = %event.provider,
                    event_id = %event.event_id,
                    reason = %reason,
                    "provider event could not be correlated"
                );
                Ok(IngestOutcome::Unmatched { reason })
            }
            Err(e) => {
                self.store
                    .mark_failed(event.provider, &event.event_id, &e.to_string())
                    .await?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryAuditLog, InMemoryCatalogRepository, InMemoryCustomerLinkRepository,
        InMemoryGrantRepository, InMemoryProviderEventStore, InMemorySyncQueue,
    };
    use crate::domain::provider::{CanonicalEventKind, Provider};
    use crate::ports::ProcessingStatus;

    fn handler(
        store: Arc<InMemoryProviderEventStore>,
    ) -> IngestProviderEventHandler {
        let apply = Arc::new(ApplyProviderEventHandler::new(
            Arc::new(InMemoryGrantRepository::new()),
            Arc::new(InMemoryCustomerLinkRepository::new()),
            Arc::new(InMemoryCatalogRepository::new()),
            Arc::new(InMemorySyncQueue::new()),
            Arc::new(InMemoryAuditLog::new()),
        ));
        IngestProviderEventHandler::new(store, apply)
    }

    fn event() -> NormalizedEvent {
        let mut e = NormalizedEvent::new(
            Provider::Stripe,
            "evt_1",
            CanonicalEventKind::PaymentSucceeded,
        );
        e.customer_id = Some("cus_1".to_string());
        e.price_ids = vec!["price_gold".to_string()];
        e
    }

    #[tokio::test]
    async fn redelivery_is_acknowledged_without_reapplying() {
        let store = Arc::new(InMemoryProviderEventStore::new());
        let handler = handler(store.clone());

        let first = handler.handle(event(), serde_json::json!({})).await.unwrap();
        // Empty catalog: the event is stored but uncorrelated.
        assert!(matches!(first, IngestOutcome::Unmatched { .. }));

        let second = handler.handle(event(), serde_json::json!({})).await.unwrap();
        assert_eq!(second, IngestOutcome::Duplicate);
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn uncorrelated_event_is_recorded_as_failed() {
        let store = Arc::new(InMemoryProviderEventStore::new());
        let handler = handler(store.clone());

        handler.handle(event(), serde_json::json!({})).await.unwrap();

        let records = store.records().await;
        assert!(matches!(records[0].status, ProcessingStatus::Failed { .. }));
    }
}
