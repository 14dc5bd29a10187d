//! PostgreSQL implementation of ProviderEventStore.
//!
//! The `(provider, event_id)` primary key is the idempotency guarantee:
//! concurrent deliveries of the same event race on the constraint, one
//! insert wins, and every other caller observes a duplicate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::provider::{CanonicalEventKind, NormalizedEvent, Provider};
use crate::ports::{
    EventCorrelation, ProcessingStatus, ProviderEventRecord, ProviderEventStore, RecordOutcome,
};

use super::database_error;

const EVENT_COLUMNS: &str = "provider, event_id, kind, object_id, customer_id, price_ids, \
     occurred_at, period_end, status, error, payload, recorded_at";

/// PostgreSQL implementation of the ProviderEventStore port.
pub struct PostgresProviderEventStore {
    pool: PgPool,
}

impl PostgresProviderEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(
        &self,
        provider: Provider,
        event_id: &str,
    ) -> Result<Option<ProviderEventRecord>, DomainError> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM provider_events WHERE provider = $1 AND event_id = $2"
        ))
        .bind(provider.as_str())
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("fetch provider event", e))?;

        row.map(ProviderEventRecord::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    provider: String,
    event_id: String,
    kind: String,
    object_id: Option<String>,
    customer_id: Option<String>,
    price_ids: Vec<String>,
    occurred_at: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    status: String,
    error: Option<String>,
    payload: serde_json::Value,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for ProviderEventRecord {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let provider = parse_provider(&row.provider)?;
        let kind = parse_kind(&row.kind)?;
        let status = parse_status(&row.status, row.error)?;

        Ok(ProviderEventRecord {
            event: NormalizedEvent {
                provider,
                event_id: row.event_id,
                kind,
                object_id: row.object_id,
                customer_id: row.customer_id,
                price_ids: row.price_ids,
                occurred_at: row.occurred_at.map(Timestamp::from_datetime),
                period_end: row.period_end.map(Timestamp::from_datetime),
            },
            status,
            payload: row.payload,
            recorded_at: Timestamp::from_datetime(row.recorded_at),
        })
    }
}

fn parse_provider(s: &str) -> Result<Provider, DomainError> {
    Provider::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid provider value: {}", s),
        )
    })
}

fn parse_kind(s: &str) -> Result<CanonicalEventKind, DomainError> {
    CanonicalEventKind::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid event kind value: {}", s),
        )
    })
}

fn parse_status(s: &str, error: Option<String>) -> Result<ProcessingStatus, DomainError> {
    match s {
        "received" => Ok(ProcessingStatus::Received),
        "processed" => Ok(ProcessingStatus::Processed),
        "failed" => Ok(ProcessingStatus::Failed {
            error: error.unwrap_or_default(),
        }),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid processing status value: {}", s),
        )),
    }
}

fn status_to_string(status: &ProcessingStatus) -> &'static str {
    match status {
        ProcessingStatus::Received => "received",
        ProcessingStatus::Processed => "processed",
        ProcessingStatus::Failed { .. } => "failed",
    }
}

#[async_trait]
impl ProviderEventStore for PostgresProviderEventStore {
    async fn record(
        &self,
        event: NormalizedEvent,
        payload: serde_json::Value,
    ) -> Result<RecordOutcome, DomainError> {
        let record = ProviderEventRecord::received(event, payload);

        let result = sqlx::query(
            r#"
            INSERT INTO provider_events (
                provider, event_id, kind, object_id, customer_id, price_ids,
                occurred_at, period_end, status, error, payload, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10, $11)
            ON CONFLICT (provider, event_id) DO NOTHING
            "#,
        )
        .bind(record.event.provider.as_str())
        .bind(&record.event.event_id)
        .bind(record.event.kind.as_str())
        .bind(&record.event.object_id)
        .bind(&record.event.customer_id)
        .bind(&record.event.price_ids)
        .bind(record.event.occurred_at.map(|t| *t.as_datetime()))
        .bind(record.event.period_end.map(|t| *t.as_datetime()))
        .bind(status_to_string(&record.status))
        .bind(&record.payload)
        .bind(record.recorded_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("record provider event", e))?;

        if result.rows_affected() == 1 {
            return Ok(RecordOutcome::Inserted(record));
        }

        // Lost the constraint race; the existing record is authoritative.
        let existing = self
            .fetch(record.event.provider, &record.event.event_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    "duplicate insert but existing event row is missing",
                )
            })?;
        Ok(RecordOutcome::Duplicate(existing))
    }

    async fn mark_processed(
        &self,
        provider: Provider,
        event_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE provider_events SET status = 'processed', error = NULL \
             WHERE provider = $1 AND event_id = $2",
        )
        .bind(provider.as_str())
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("mark provider event processed", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Provider event not found: {provider}/{event_id}"),
            ));
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        provider: Provider,
        event_id: &str,
        error: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE provider_events SET status = 'failed', error = $3 \
             WHERE provider = $1 AND event_id = $2",
        )
        .bind(provider.as_str())
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("mark provider event failed", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Provider event not found: {provider}/{event_id}"),
            ));
        }
        Ok(())
    }

    async fn latest_matching(
        &self,
        provider: Provider,
        correlation: EventCorrelation,
        kind: Option<CanonicalEventKind>,
    ) -> Result<Option<ProviderEventRecord>, DomainError> {
        let query = match &correlation {
            EventCorrelation::Customer(_) => format!(
                "SELECT {EVENT_COLUMNS} FROM provider_events \
                 WHERE provider = $1 AND customer_id = $2 \
                   AND ($3::text IS NULL OR kind = $3) \
                 ORDER BY recorded_at DESC LIMIT 1"
            ),
            EventCorrelation::Price(_) => format!(
                "SELECT {EVENT_COLUMNS} FROM provider_events \
                 WHERE provider = $1 AND $2 = ANY(price_ids) \
                   AND ($3::text IS NULL OR kind = $3) \
                 ORDER BY recorded_at DESC LIMIT 1"
            ),
        };
        let reference = match &correlation {
            EventCorrelation::Customer(c) => c.clone(),
            EventCorrelation::Price(p) => p.clone(),
        };

        let row: Option<EventRow> = sqlx::query_as(&query)
            .bind(provider.as_str())
            .bind(reference)
            .bind(kind.map(|k| k.as_str()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("query latest matching event", e))?;

        row.map(ProviderEventRecord::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_round_trips_non_failed_values() {
        assert_eq!(
            parse_status("received", None).unwrap(),
            ProcessingStatus::Received
        );
        assert_eq!(
            parse_status("processed", None).unwrap(),
            ProcessingStatus::Processed
        );
    }

    #[test]
    fn parse_status_failed_carries_the_error_column() {
        let status = parse_status("failed", Some("no customer link".into())).unwrap();
        assert_eq!(
            status,
            ProcessingStatus::Failed {
                error: "no customer link".into()
            }
        );
    }

    #[test]
    fn parse_status_rejects_unknown_values() {
        assert!(parse_status("pending", None).is_err());
        assert!(parse_status("", None).is_err());
    }

    #[test]
    fn status_to_string_is_consistent() {
        assert_eq!(status_to_string(&ProcessingStatus::Received), "received");
        assert_eq!(status_to_string(&ProcessingStatus::Processed), "processed");
        assert_eq!(
            status_to_string(&ProcessingStatus::Failed { error: "x".into() }),
            "failed"
        );
    }

    #[test]
    fn parse_provider_and_kind_reject_unknown_values() {
        assert!(parse_provider("paypal").is_err());
        assert!(parse_kind("invoice.paid").is_err());
    }
}
