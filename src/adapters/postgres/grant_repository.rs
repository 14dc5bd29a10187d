//! PostgreSQL implementation of GrantRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entitlement::{EntitlementGrant, GrantSource, GrantStatus, SourceRef};
use crate::domain::foundation::{
    DomainError, ErrorCode, GrantId, GroupId, SubjectId, TierId, Timestamp,
};
use crate::domain::provider::Provider;
use crate::ports::GrantRepository;

use super::database_error;

const GRANT_COLUMNS: &str = "id, subject_id, tier_id, group_id, status, valid_from, \
     valid_through, source, source_provider, source_object_id, note, created_at, updated_at";

/// PostgreSQL implementation of the GrantRepository port.
pub struct PostgresGrantRepository {
    pool: PgPool,
}

impl PostgresGrantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GrantRow {
    id: Uuid,
    subject_id: String,
    tier_id: Uuid,
    group_id: String,
    status: String,
    valid_from: DateTime<Utc>,
    valid_through: Option<DateTime<Utc>>,
    source: String,
    source_provider: Option<String>,
    source_object_id: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GrantRow> for EntitlementGrant {
    type Error = DomainError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        let source_ref = match (row.source_provider, row.source_object_id) {
            (Some(provider), Some(object_id)) => Some(SourceRef {
                provider: parse_provider(&provider)?,
                object_id,
            }),
            (None, None) => None,
            _ => {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "source_provider and source_object_id must be set together",
                ))
            }
        };

        Ok(EntitlementGrant {
            id: GrantId::from_uuid(row.id),
            subject_id: SubjectId::new(row.subject_id)
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?,
            tier_id: TierId::from_uuid(row.tier_id),
            group_id: GroupId::new(row.group_id)
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?,
            status: parse_status(&row.status)?,
            valid_from: Timestamp::from_datetime(row.valid_from),
            valid_through: row.valid_through.map(Timestamp::from_datetime),
            source: parse_source(&row.source)?,
            source_ref,
            note: row.note,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<GrantStatus, DomainError> {
    match s {
        "pending" => Ok(GrantStatus::Pending),
        "active" => Ok(GrantStatus::Active),
        "past_due" => Ok(GrantStatus::PastDue),
        "canceled" => Ok(GrantStatus::Canceled),
        "expired" => Ok(GrantStatus::Expired),
        "suspended_dispute" => Ok(GrantStatus::SuspendedDispute),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid grant status value: {}", s),
        )),
    }
}

fn status_to_string(status: &GrantStatus) -> &'static str {
    match status {
        GrantStatus::Pending => "pending",
        GrantStatus::Active => "active",
        GrantStatus::PastDue => "past_due",
        GrantStatus::Canceled => "canceled",
        GrantStatus::Expired => "expired",
        GrantStatus::SuspendedDispute => "suspended_dispute",
    }
}

fn parse_source(s: &str) -> Result<GrantSource, DomainError> {
    match s {
        "checkout" => Ok(GrantSource::Checkout),
        "manual" => Ok(GrantSource::Manual),
        "reconciliation" => Ok(GrantSource::Reconciliation),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid grant source value: {}", s),
        )),
    }
}

fn source_to_string(source: &GrantSource) -> &'static str {
    match source {
        GrantSource::Checkout => "checkout",
        GrantSource::Manual => "manual",
        GrantSource::Reconciliation => "reconciliation",
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

#[async_trait]
impl GrantRepository for PostgresGrantRepository {
    async fn save(&self, grant: &EntitlementGrant) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO entitlement_grants (
                id, subject_id, tier_id, group_id, status, valid_from, valid_through,
                source, source_provider, source_object_id, note, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(grant.id.as_uuid())
        .bind(grant.subject_id.as_str())
        .bind(grant.tier_id.as_uuid())
        .bind(grant.group_id.as_str())
        .bind(status_to_string(&grant.status))
        .bind(grant.valid_from.as_datetime())
        .bind(grant.valid_through.map(|t| *t.as_datetime()))
        .bind(source_to_string(&grant.source))
        .bind(grant.source_ref.as_ref().map(|r| r.provider.as_str()))
        .bind(grant.source_ref.as_ref().map(|r| r.object_id.as_str()))
        .bind(&grant.note)
        .bind(grant.created_at.as_datetime())
        .bind(grant.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("save grant", e))?;

        Ok(())
    }

    async fn update(&self, grant: &EntitlementGrant) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE entitlement_grants SET
                status = $2,
                valid_from = $3,
                valid_through = $4,
                note = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(grant.id.as_uuid())
        .bind(status_to_string(&grant.status))
        .bind(grant.valid_from.as_datetime())
        .bind(grant.valid_through.map(|t| *t.as_datetime()))
        .bind(&grant.note)
        .bind(grant.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("update grant", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::GrantNotFound,
                format!("Grant not found: {}", grant.id),
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &GrantId) -> Result<Option<EntitlementGrant>, DomainError> {
        let row: Option<GrantRow> = sqlx::query_as(&format!(
            "SELECT {GRANT_COLUMNS} FROM entitlement_grants WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find grant by id", e))?;

        row.map(EntitlementGrant::try_from).transpose()
    }

    async fn find_by_source_ref(
        &self,
        provider: Provider,
        object_id: &str,
    ) -> Result<Option<EntitlementGrant>, DomainError> {
        // Terminal grants are invisible here: a canceled subscription that
        // later emits events must not resurrect its old grant.
        let row: Option<GrantRow> = sqlx::query_as(&format!(
            "SELECT {GRANT_COLUMNS} FROM entitlement_grants \
             WHERE source_provider = $1 AND source_object_id = $2 \
               AND status NOT IN ('canceled', 'expired') \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(provider.as_str())
        .bind(object_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find grant by source ref", e))?;

        row.map(EntitlementGrant::try_from).transpose()
    }

    async fn find_for_subject(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
    ) -> Result<Vec<EntitlementGrant>, DomainError> {
        let rows: Vec<GrantRow> = sqlx::query_as(&format!(
            "SELECT {GRANT_COLUMNS} FROM entitlement_grants \
             WHERE group_id = $1 AND subject_id = $2 \
             ORDER BY created_at ASC"
        ))
        .bind(group_id.as_str())
        .bind(subject_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("find grants for subject", e))?;

        rows.into_iter().map(EntitlementGrant::try_from).collect()
    }

    async fn find_for_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<EntitlementGrant>, DomainError> {
        let rows: Vec<GrantRow> = sqlx::query_as(&format!(
            "SELECT {GRANT_COLUMNS} FROM entitlement_grants \
             WHERE group_id = $1 \
             ORDER BY created_at ASC"
        ))
        .bind(group_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("find grants for group", e))?;

        rows.into_iter().map(EntitlementGrant::try_from).collect()
    }

    async fn list_expirable(
        &self,
        as_of: Timestamp,
        limit: u32,
    ) -> Result<Vec<EntitlementGrant>, DomainError> {
        // Only statuses with a legal transition to Expired; a suspended
        // dispute holds the grant open until the dispute resolves.
        let rows: Vec<GrantRow> = sqlx::query_as(&format!(
            "SELECT {GRANT_COLUMNS} FROM entitlement_grants \
             WHERE valid_through IS NOT NULL AND valid_through <= $1 \
               AND status IN ('pending', 'active', 'past_due') \
             ORDER BY valid_through ASC LIMIT $2"
        ))
        .bind(as_of.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("list expirable grants", e))?;

        rows.into_iter().map(EntitlementGrant::try_from).collect()
    }
}
