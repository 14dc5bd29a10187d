//! ExpireSweepHandler - moves grants whose window has closed to Expired.
//!
//! The sweep is the only writer of the Expired status. Effectiveness is
//! already derived, so access ends the moment the window closes; the sweep
//! makes the ledger record it and triggers role removal.

use std::sync::Arc;

use crate::domain::entitlement::GrantStatus;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::sync::{RoleSyncRequest, SyncOrigin, SyncScope};
use crate::ports::{AuditAction, AuditLog, AuditRecord, GrantRepository, SyncQueue};

pub struct ExpireSweepHandler {
    grants: Arc<dyn GrantRepository>,
    queue: Arc<dyn SyncQueue>,
    audit: Arc<dyn AuditLog>,
}

impl ExpireSweepHandler {
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

    /// Expires up to `limit` grants whose window closed at or before
    /// `as_of`. Returns how many were expired.
    pub async fn sweep(&self, as_of: Timestamp, limit: u32) -> Result<u32, DomainError> {
        let expirable = self.grants.list_expirable(as_of, limit).await?;
        let mut expired = 0u32;

        for mut grant in expirable {
            if let Err(e) = grant.transition(GrantStatus::Expired) {
                // The repository filter and the state machine disagree only
                // if another writer raced us; skip and move on.
                tracing::warn!(grant_id = %grant.id, error = %e, "skipping non-expirable grant");
                continue;
            }
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
                AuditAction::GrantExpired,
                Some(grant.group_id.clone()),
                Some(grant.subject_id.clone()),
                serde_json::json!({
                    "grant_id": grant.id.to_string(),
                    "valid_through": grant.valid_through,
                }),
            );
            if let Err(e) = self.audit.append(record).await {
                tracing::warn!(error = %e, "audit append failed");
            }

            expired += 1;
        }

        if expired > 0 {
            tracing::info!(count = expired, "expiry sweep finished");
        }
        Ok(expired)
    }
}
