//! ProviderEventStore port - idempotent ledger of normalized payment events.
//!
//! Processors redeliver webhooks after timeouts, 5xx responses, and lost
//! acknowledgments. The store deduplicates by (provider, event id) so that
//! delivery retries can be applied unconditionally: a repeat insert is a
//! no-op returning the existing record, and business effects never
//! double-apply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::provider::{CanonicalEventKind, NormalizedEvent, Provider};

/// Processing status of a stored provider event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Stored, not yet reconciled.
    Received,
    /// Reconciliation applied (or deliberately ignored) the event.
    Processed,
    /// Reconciliation could not apply the event.
    Failed { error: String },
}

/// Immutable record of one externally observed payment occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEventRecord {
    pub event: NormalizedEvent,
    pub status: ProcessingStatus,
    /// Raw payload snapshot for incident reconstruction.
    pub payload: serde_json::Value,
    pub recorded_at: Timestamp,
}

impl ProviderEventRecord {
    /// Creates a freshly received record.
    pub fn received(event: NormalizedEvent, payload: serde_json::Value) -> Self {
        Self {
            event,
            status: ProcessingStatus::Received,
            payload,
            recorded_at: Timestamp::now(),
        }
    }
}

/// Result of attempting to record an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First time seeing this (provider, event id).
    Inserted(ProviderEventRecord),
    /// Already recorded; the existing record is returned unchanged.
    Duplicate(ProviderEventRecord),
}

impl RecordOutcome {
    /// True for a first insert.
    pub fn is_inserted(&self) -> bool {
        matches!(self, RecordOutcome::Inserted(_))
    }

    /// The stored record, whichever way the call went.
    pub fn record(&self) -> &ProviderEventRecord {
        match self {
            RecordOutcome::Inserted(r) | RecordOutcome::Duplicate(r) => r,
        }
    }
}

/// Correlation query for diagnostics: "the latest event matching this
/// customer or price".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventCorrelation {
    Customer(String),
    Price(String),
}

/// Port for the append-only provider event ledger.
///
/// Implementations must enforce the (provider, event id) uniqueness with a
/// storage-level constraint so concurrent deliveries race safely.
#[async_trait]
pub trait ProviderEventStore: Send + Sync {
    /// Records an event idempotently.
    async fn record(
        &self,
        event: NormalizedEvent,
        payload: serde_json::Value,
    ) -> Result<RecordOutcome, DomainError>;

    /// Marks an event as reconciled.
    async fn mark_processed(&self, provider: Provider, event_id: &str)
        -> Result<(), DomainError>;

    /// Marks an event as failed with a readable reason.
    async fn mark_failed(
        &self,
        provider: Provider,
        event_id: &str,
        error: &str,
    ) -> Result<(), DomainError>;

    /// Most recent event for a provider matching the correlation,
    /// optionally narrowed to a canonical kind. Feeds health diagnostics.
    async fn latest_matching(
        &self,
        provider: Provider,
        correlation: EventCorrelation,
        kind: Option<CanonicalEventKind>,
    ) -> Result<Option<ProviderEventRecord>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn received_record_starts_unprocessed() {
        let event = NormalizedEvent::new(
            Provider::Stripe,
            "evt_1",
            CanonicalEventKind::PaymentSucceeded,
        );
        let record = ProviderEventRecord::received(event, serde_json::json!({}));

        assert_eq!(record.status, ProcessingStatus::Received);
    }

    #[test]
    fn outcome_exposes_the_record_either_way() {
        let event = NormalizedEvent::new(
            Provider::Square,
            "sq_evt_1",
            CanonicalEventKind::RefundIssued,
        );
        let record = ProviderEventRecord::received(event, serde_json::json!({}));

        let inserted = RecordOutcome::Inserted(record.clone());
        let duplicate = RecordOutcome::Duplicate(record.clone());

        assert!(inserted.is_inserted());
        assert!(!duplicate.is_inserted());
        assert_eq!(inserted.record(), duplicate.record());
    }

    #[test]
    fn failed_status_carries_the_reason() {
        let status = ProcessingStatus::Failed {
            error: "no customer link for cus_42".to_string(),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("no customer link"));
    }
}
