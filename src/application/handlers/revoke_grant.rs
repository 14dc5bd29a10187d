//! RevokeGrantHandler - operator-initiated revocation.
//!
//! Revocation is idempotent: revoking an already revoked grant refreshes
//! the note but enqueues no new sync work, so repeated operator clicks
//! cannot flood the queue.

use std::sync::Arc;

use crate::domain::entitlement::GrantStatus;
use crate::domain::foundation::{DomainError, ErrorCode, GrantId};
use crate::domain::foundation::StateMachine;
use crate::domain::sync::{RoleSyncRequest, SyncOrigin, SyncScope};
use crate::ports::{AuditAction, AuditLog, AuditRecord, GrantRepository, SyncQueue};

#[derive(Debug, Clone)]
pub struct RevokeGrantCommand {
    pub grant_id: GrantId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    /// The grant was already terminal; only the note changed.
    AlreadyRevoked,
}

pub struct RevokeGrantHandler {
    grants: Arc<dyn GrantRepository>,
    queue: Arc<dyn SyncQueue>,
    audit: Arc<dyn AuditLog>,
}

impl RevokeGrantHandler {
    pub fn new(
        grants: Arc<dyn GrantRepository>,
        queue: Arc<dyn SyncQueue>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            grants,
            queue,
            audit,
        }
    }

    pub async fn handle(&self, cmd: RevokeGrantCommand) -> Result<RevokeOutcome, DomainError> {
        let mut grant = self
            .grants
            .find_by_id(&cmd.grant_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::GrantNotFound, "grant not found"))?;

        if grant.status.is_terminal() {
            grant.set_note(cmd.reason);
            self.grants.update(&grant).await?;
            return Ok(RevokeOutcome::AlreadyRevoked);
        }

        grant
            .transition(GrantStatus::Canceled)
            .map_err(DomainError::from)?;
        grant.set_note(cmd.reason.clone());
        self.grants.update(&grant).await?;

        self.queue
            .enqueue(RoleSyncRequest::new(
                grant.group_id.clone(),
                SyncScope::Subject {
                    subject_id: grant.subject_id.clone(),
                },
                SyncOrigin::EntitlementChange,
            ))
            .await?;

        let record = AuditRecord::new(
            AuditAction::GrantRevoked,
            Some(grant.group_id.clone()),
            Some(grant.subject_id.clone()),
            serde_json::json!({
                "grant_id": grant.id.to_string(),
                "reason": cmd.reason,
            }),
        );
        if let Err(e) = self.audit.append(record).await {
            tracing::warn!(error = %e, "audit append failed");
        }

        Ok(RevokeOutcome::Revoked)
    }
}
