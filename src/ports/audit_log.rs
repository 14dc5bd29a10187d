//! AuditLog port - append-only trail of entitlement and sync activity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuditRecordId, DomainError, GroupId, SubjectId, Timestamp};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    GrantCreated,
    GrantStatusChanged,
    GrantExtended,
    GrantRevoked,
    GrantExpired,
    RoleAdded,
    RoleRemoved,
    SyncRequested,
    SyncCompleted,
    SyncFailed,
    CustomerLinked,
    EventIgnored,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::GrantCreated => "grant_created",
            AuditAction::GrantStatusChanged => "grant_status_changed",
            AuditAction::GrantExtended => "grant_extended",
            AuditAction::GrantRevoked => "grant_revoked",
            AuditAction::GrantExpired => "grant_expired",
            AuditAction::RoleAdded => "role_added",
            AuditAction::RoleRemoved => "role_removed",
            AuditAction::SyncRequested => "sync_requested",
            AuditAction::SyncCompleted => "sync_completed",
            AuditAction::SyncFailed => "sync_failed",
            AuditAction::CustomerLinked => "customer_linked",
            AuditAction::EventIgnored => "event_ignored",
        }
    }
}

/// Who caused the transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "actor", rename_all = "snake_case")]
pub enum AuditActor {
    /// Reconciliation, sweeps, and other automated paths.
    System,
    /// A human operator acting through admin tooling.
    Operator { id: String },
}

/// One audit entry. `details` is free-form structured context; shapes vary
/// per action and are for operators, not programs. `correlation_id` ties
/// the record back to its trigger (provider event id, sync request id) for
/// incident reconstruction across the external systems involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub actor: AuditActor,
    pub action: AuditAction,
    pub group_id: Option<GroupId>,
    pub subject_id: Option<SubjectId>,
    pub correlation_id: Option<String>,
    pub details: serde_json::Value,
    pub occurred_at: Timestamp,
}

impl AuditRecord {
    /// Creates a system-actor record with no correlation id.
    pub fn new(
        action: AuditAction,
        group_id: Option<GroupId>,
        subject_id: Option<SubjectId>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: AuditRecordId::new(),
            actor: AuditActor::System,
            action,
            group_id,
            subject_id,
            correlation_id: None,
            details,
            occurred_at: Timestamp::now(),
        }
    }

    pub fn by(mut self, actor: AuditActor) -> Self {
        self.actor = actor;
        self
    }

    pub fn correlated_to(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Port for the audit trail.
///
/// Audit writes must never fail the operation they describe; callers log
/// and continue on error.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, record: AuditRecord) -> Result<(), DomainError>;

    /// Most recent records for a group, newest first.
    async fn recent(
        &self,
        group_id: &GroupId,
        limit: u32,
    ) -> Result<Vec<AuditRecord>, DomainError>;
}
