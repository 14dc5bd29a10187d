//! In-memory ProviderEventStore.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::provider::{CanonicalEventKind, NormalizedEvent, Provider};
use crate::ports::{
    EventCorrelation, ProcessingStatus, ProviderEventRecord, ProviderEventStore, RecordOutcome,
};

/// In-memory event ledger keyed by (provider, event id). Insertion order is
/// kept so `latest_matching` can answer most-recent-first.
#[derive(Default)]
pub struct InMemoryProviderEventStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    by_key: HashMap<(Provider, String), usize>,
    records: Vec<ProviderEventRecord>,
}

impl InMemoryProviderEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored records, oldest first.
    pub async fn records(&self) -> Vec<ProviderEventRecord> {
        self.inner.read().await.records.clone()
    }
}

#[async_trait]
impl ProviderEventStore for InMemoryProviderEventStore {
    async fn record(
        &self,
        event: NormalizedEvent,
        payload: serde_json::Value,
    ) -> Result<RecordOutcome, DomainError> {
        let mut inner = self.inner.write().await;
        let key = (event.provider, event.event_id.clone());

        if let Some(&idx) = inner.by_key.get(&key) {
            return Ok(RecordOutcome::Duplicate(inner.records[idx].clone()));
        }

        let record = ProviderEventRecord::received(event, payload);
        inner.records.push(record.clone());
        let idx = inner.records.len() - 1;
        inner.by_key.insert(key, idx);
        Ok(RecordOutcome::Inserted(record))
    }

    async fn mark_processed(
        &self,
        provider: Provider,
        event_id: &str,
    ) -> Result<(), DomainError> {
        self.set_status(provider, event_id, ProcessingStatus::Processed)
            .await
    }

    async fn mark_failed(
        &self,
        provider: Provider,
        event_id: &str,
        error: &str,
    ) -> Result<(), DomainError> {
        self.set_status(
            provider,
            event_id,
            ProcessingStatus::Failed {
                error: error.to_string(),
            },
        )
        .await
    }

    async fn latest_matching(
        &self,
        provider: Provider,
        correlation: EventCorrelation,
        kind: Option<CanonicalEventKind>,
    ) -> Result<Option<ProviderEventRecord>, DomainError> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .iter()
            .rev()
            .find(|r| {
                r.event.provider == provider
                    && kind.map_or(true, |k| r.event.kind == k)
                    && match &correlation {
                        EventCorrelation::Customer(c) => r.event.customer_id.as_deref() == Some(c),
                        EventCorrelation::Price(p) => r.event.price_ids.iter().any(|id| id == p),
                    }
            })
            .cloned())
    }
}

impl InMemoryProviderEventStore {
    async fn set_status(
        &self,
        provider: Provider,
        event_id: &str,
        status: ProcessingStatus,
    ) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;
        let idx = *inner
            .by_key
            .get(&(provider, event_id.to_string()))
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::InternalError,
                    format!("unknown event {provider}:{event_id}"),
                )
            })?;
        inner.records[idx].status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, kind: CanonicalEventKind) -> NormalizedEvent {
        NormalizedEvent::new(Provider::Stripe, id, kind)
    }

    #[tokio::test]
    async fn repeat_record_returns_existing_unchanged() {
        let store = InMemoryProviderEventStore::new();
        let first = store
            .record(
                event("evt_1", CanonicalEventKind::PaymentSucceeded),
                serde_json::json!({"n": 1}),
            )
            .await
            .unwrap();
        assert!(first.is_inserted());

        store
            .mark_processed(Provider::Stripe, "evt_1")
            .await
            .unwrap();

        let second = store
            .record(
                event("evt_1", CanonicalEventKind::PaymentSucceeded),
                serde_json::json!({"n": 2}),
            )
            .await
            .unwrap();

        // The duplicate reflects the stored record, including its status
        // and original payload.
        match second {
            RecordOutcome::Duplicate(r) => {
                assert_eq!(r.status, ProcessingStatus::Processed);
                assert_eq!(r.payload, serde_json::json!({"n": 1}));
            }
            RecordOutcome::Inserted(_) => panic!("expected duplicate"),
        }
    }

    #[tokio::test]
    async fn latest_matching_is_most_recent_first() {
        let store = InMemoryProviderEventStore::new();
        for (id, customer) in [("evt_1", "cus_a"), ("evt_2", "cus_a"), ("evt_3", "cus_b")] {
            let mut e = event(id, CanonicalEventKind::PaymentSucceeded);
            e.customer_id = Some(customer.to_string());
            store.record(e, serde_json::json!({})).await.unwrap();
        }

        let found = store
            .latest_matching(
                Provider::Stripe,
                EventCorrelation::Customer("cus_a".to_string()),
                None,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.event.event_id, "evt_2");
    }

    #[tokio::test]
    async fn latest_matching_narrows_by_kind_and_price() {
        let store = InMemoryProviderEventStore::new();
        let mut paid = event("evt_1", CanonicalEventKind::PaymentSucceeded);
        paid.price_ids = vec!["price_gold".to_string()];
        store.record(paid, serde_json::json!({})).await.unwrap();

        let mut failed = event("evt_2", CanonicalEventKind::PaymentFailed);
        failed.price_ids = vec!["price_gold".to_string()];
        store.record(failed, serde_json::json!({})).await.unwrap();

        let found = store
            .latest_matching(
                Provider::Stripe,
                EventCorrelation::Price("price_gold".to_string()),
                Some(CanonicalEventKind::PaymentSucceeded),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.event.event_id, "evt_1");
    }
}
