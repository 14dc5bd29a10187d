//! PostgreSQL implementation of SyncQueue.
//!
//! Claiming is the only delicate operation. The guarantee is twofold: no
//! request is ever claimed by two workers, and a group never has two
//! requests in flight. A per-group advisory transaction lock serializes
//! claimers of the same group; the claim itself moves the oldest pending
//! row to `in_progress` in one UPDATE.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, GroupId, SubjectId, SyncRequestId, Timestamp,
};
use crate::domain::sync::{RoleSyncRequest, SyncOrigin, SyncRequestStatus, SyncScope};
use crate::ports::SyncQueue;

use super::database_error;

const REQUEST_COLUMNS: &str = "id, group_id, scope, subject_id, origin, status, error, \
     requested_at, claimed_at, finished_at";

/// PostgreSQL implementation of the SyncQueue port.
pub struct PostgresSyncQueue {
    pool: PgPool,
}

impl PostgresSyncQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    group_id: String,
    scope: String,
    subject_id: Option<String>,
    origin: String,
    status: String,
    error: Option<String>,
    requested_at: DateTime<Utc>,
    claimed_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for RoleSyncRequest {
    type Error = DomainError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let group_id = GroupId::new(row.group_id)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;
        let scope = parse_scope(&row.scope, row.subject_id)?;

        Ok(RoleSyncRequest {
            id: SyncRequestId::from_uuid(row.id),
            group_id,
            scope,
            origin: parse_origin(&row.origin)?,
            status: parse_status(&row.status)?,
            error: row.error,
            requested_at: Timestamp::from_datetime(row.requested_at),
            claimed_at: row.claimed_at.map(Timestamp::from_datetime),
            finished_at: row.finished_at.map(Timestamp::from_datetime),
        })
    }
}

fn parse_scope(s: &str, subject_id: Option<String>) -> Result<SyncScope, DomainError> {
    match (s, subject_id) {
        ("group", None) => Ok(SyncScope::Group),
        ("subject", Some(id)) => Ok(SyncScope::Subject {
            subject_id: SubjectId::new(id)
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?,
        }),
        (s, _) => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid scope/subject combination for scope value: {}", s),
        )),
    }
}

fn scope_columns(scope: &SyncScope) -> (&'static str, Option<&str>) {
    match scope {
        SyncScope::Group => ("group", None),
        SyncScope::Subject { subject_id } => ("subject", Some(subject_id.as_str())),
    }
}

fn parse_origin(s: &str) -> Result<SyncOrigin, DomainError> {
    match s {
        "manual" => Ok(SyncOrigin::Manual),
        "bootstrap" => Ok(SyncOrigin::Bootstrap),
        "entitlement_change" => Ok(SyncOrigin::EntitlementChange),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid sync origin value: {}", s),
        )),
    }
}

fn origin_to_string(origin: &SyncOrigin) -> &'static str {
    match origin {
        SyncOrigin::Manual => "manual",
        SyncOrigin::Bootstrap => "bootstrap",
        SyncOrigin::EntitlementChange => "entitlement_change",
    }
}

fn parse_status(s: &str) -> Result<SyncRequestStatus, DomainError> {
    match s {
        "pending" => Ok(SyncRequestStatus::Pending),
        "in_progress" => Ok(SyncRequestStatus::InProgress),
        "completed" => Ok(SyncRequestStatus::Completed),
        "failed" => Ok(SyncRequestStatus::Failed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid sync request status value: {}", s),
        )),
    }
}

fn status_to_string(status: &SyncRequestStatus) -> &'static str {
    match status {
        SyncRequestStatus::Pending => "pending",
        SyncRequestStatus::InProgress => "in_progress",
        SyncRequestStatus::Completed => "completed",
        SyncRequestStatus::Failed => "failed",
    }
}

#[async_trait]
impl SyncQueue for PostgresSyncQueue {
    async fn enqueue(&self, request: RoleSyncRequest) -> Result<(), DomainError> {
        let (scope, subject_id) = scope_columns(&request.scope);

        sqlx::query(
            r#"
            INSERT INTO sync_requests (
                id, group_id, scope, subject_id, origin, status, error,
                requested_at, claimed_at, finished_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.group_id.as_str())
        .bind(scope)
        .bind(subject_id)
        .bind(origin_to_string(&request.origin))
        .bind(status_to_string(&request.status))
        .bind(&request.error)
        .bind(request.requested_at.as_datetime())
        .bind(request.claimed_at.map(|t| *t.as_datetime()))
        .bind(request.finished_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("enqueue sync request", e))?;

        Ok(())
    }

    async fn claim_next(
        &self,
        group_id: &GroupId,
    ) -> Result<Option<RoleSyncRequest>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("begin claim transaction", e))?;

        // Serialize claimers per group. A contended lock means another
        // worker is claiming for this group right now; yield the tick.
        let (locked,): (bool,) =
            sqlx::query_as("SELECT pg_try_advisory_xact_lock(hashtext($1))")
                .bind(group_id.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| database_error("acquire group claim lock", e))?;
        if !locked {
            return Ok(None);
        }

        let (in_flight,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM sync_requests \
             WHERE group_id = $1 AND status = 'in_progress')",
        )
        .bind(group_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| database_error("check in-flight sync request", e))?;
        if in_flight {
            return Ok(None);
        }

        let row: Option<RequestRow> = sqlx::query_as(&format!(
            "UPDATE sync_requests SET status = 'in_progress', claimed_at = $2 \
             WHERE id = ( \
                 SELECT id FROM sync_requests \
                 WHERE group_id = $1 AND status = 'pending' \
                 ORDER BY requested_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(group_id.as_str())
        .bind(Timestamp::now().as_datetime())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| database_error("claim sync request", e))?;

        tx.commit()
            .await
            .map_err(|e| database_error("commit claim transaction", e))?;

        row.map(RoleSyncRequest::try_from).transpose()
    }

    async fn complete(&self, id: &SyncRequestId) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE sync_requests SET status = 'completed', finished_at = $2 \
             WHERE id = $1 AND status = 'in_progress'",
        )
        .bind(id.as_uuid())
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("complete sync request", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SyncRequestNotFound,
                format!("No in-progress sync request: {id}"),
            ));
        }
        Ok(())
    }

    async fn fail(&self, id: &SyncRequestId, error: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE sync_requests SET status = 'failed', error = $3, finished_at = $2 \
             WHERE id = $1 AND status = 'in_progress'",
        )
        .bind(id.as_uuid())
        .bind(Timestamp::now().as_datetime())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("fail sync request", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SyncRequestNotFound,
                format!("No in-progress sync request: {id}"),
            ));
        }
        Ok(())
    }

    async fn find(&self, id: &SyncRequestId) -> Result<Option<RoleSyncRequest>, DomainError> {
        let row: Option<RequestRow> = sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM sync_requests WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find sync request", e))?;

        row.map(RoleSyncRequest::try_from).transpose()
    }

    async fn groups_with_pending(&self) -> Result<Vec<GroupId>, DomainError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT group_id FROM sync_requests WHERE status = 'pending'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("list groups with pending requests", e))?;

        rows.into_iter()
            .map(|(g,)| {
                GroupId::new(g)
                    .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))
            })
            .collect()
    }

    async fn pending_count(&self, group_id: &GroupId) -> Result<u64, DomainError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sync_requests WHERE group_id = $1 AND status = 'pending'",
        )
        .bind(group_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| database_error("count pending sync requests", e))?;

        Ok(count as u64)
    }
}
