//! PostgreSQL implementation of AuditLog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    AuditRecordId, DomainError, ErrorCode, GroupId, SubjectId, Timestamp,
};
use crate::ports::{AuditAction, AuditActor, AuditLog, AuditRecord};

use super::database_error;

/// PostgreSQL implementation of the AuditLog port.
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    actor_type: String,
    actor_id: Option<String>,
    action: String,
    group_id: Option<String>,
    subject_id: Option<String>,
    correlation_id: Option<String>,
    details: serde_json::Value,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = DomainError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let group_id = row
            .group_id
            .map(|g| {
                GroupId::new(g)
                    .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))
            })
            .transpose()?;
        let subject_id = row
            .subject_id
            .map(|s| {
                SubjectId::new(s)
                    .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))
            })
            .transpose()?;

        Ok(AuditRecord {
            id: AuditRecordId::from_uuid(row.id),
            actor: parse_actor(&row.actor_type, row.actor_id)?,
            action: parse_action(&row.action)?,
            group_id,
            subject_id,
            correlation_id: row.correlation_id,
            details: row.details,
            occurred_at: Timestamp::from_datetime(row.occurred_at),
        })
    }
}

fn parse_actor(actor_type: &str, actor_id: Option<String>) -> Result<AuditActor, DomainError> {
    match (actor_type, actor_id) {
        ("system", None) => Ok(AuditActor::System),
        ("operator", Some(id)) => Ok(AuditActor::Operator { id }),
        (t, _) => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid actor/actor_id combination for actor value: {}", t),
        )),
    }
}

fn actor_columns(actor: &AuditActor) -> (&'static str, Option<&str>) {
    match actor {
        AuditActor::System => ("system", None),
        AuditActor::Operator { id } => ("operator", Some(id.as_str())),
    }
}

fn parse_action(s: &str) -> Result<AuditAction, DomainError> {
    let action = match s {
        "grant_created" => AuditAction::GrantCreated,
        "grant_status_changed" => AuditAction::GrantStatusChanged,
        "grant_extended" => AuditAction::GrantExtended,
        "grant_revoked" => AuditAction::GrantRevoked,
        "grant_expired" => AuditAction::GrantExpired,
        "role_added" => AuditAction::RoleAdded,
        "role_removed" => AuditAction::RoleRemoved,
        "sync_requested" => AuditAction::SyncRequested,
        "sync_completed" => AuditAction::SyncCompleted,
        "sync_failed" => AuditAction::SyncFailed,
        "customer_linked" => AuditAction::CustomerLinked,
        "event_ignored" => AuditAction::EventIgnored,
        _ => {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid audit action value: {}", s),
            ))
        }
    };
    Ok(action)
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn append(&self, record: AuditRecord) -> Result<(), DomainError> {
        let (actor_type, actor_id) = actor_columns(&record.actor);

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, actor_type, actor_id, action, group_id, subject_id,
                correlation_id, details, occurred_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(actor_type)
        .bind(actor_id)
        .bind(record.action.as_str())
        .bind(record.group_id.as_ref().map(|g| g.as_str()))
        .bind(record.subject_id.as_ref().map(|s| s.as_str()))
        .bind(&record.correlation_id)
        .bind(&record.details)
        .bind(record.occurred_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("append audit record", e))?;

        Ok(())
    }

    async fn recent(
        &self,
        group_id: &GroupId,
        limit: u32,
    ) -> Result<Vec<AuditRecord>, DomainError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            "SELECT id, actor_type, actor_id, action, group_id, subject_id, \
                    correlation_id, details, occurred_at \
             FROM audit_log WHERE group_id = $1 \
             ORDER BY occurred_at DESC LIMIT $2",
        )
        .bind(group_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("list recent audit records", e))?;

        rows.into_iter().map(AuditRecord::try_from).collect()
    }
}
