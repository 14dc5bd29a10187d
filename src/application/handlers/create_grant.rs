//! CreateGrantHandler - operator-initiated grant creation.

use std::sync::Arc;

use crate::domain::entitlement::{EntitlementGrant, GrantSource, GrantStatus};
use crate::domain::foundation::{DomainError, ErrorCode, GrantId, SubjectId, TierId, Timestamp};
use crate::domain::sync::{RoleSyncRequest, SyncOrigin, SyncScope};
use crate::ports::{AuditAction, AuditLog, AuditRecord, CatalogRepository, GrantRepository, SyncQueue};

#[derive(Debug, Clone)]
pub struct CreateGrantCommand {
    pub subject_id: SubjectId,
    pub tier_id: TierId,
    pub valid_from: Timestamp,
    /// `None` follows the tier policy's own duration.
    pub valid_through: Option<Timestamp>,
    pub note: Option<String>,
}

pub struct CreateGrantHandler {
    grants: Arc<dyn GrantRepository>,
    catalog: Arc<dyn CatalogRepository>,
    queue: Arc<dyn SyncQueue>,
    audit: Arc<dyn AuditLog>,
}

impl CreateGrantHandler {
    pub fn new(
        grants: Arc<dyn GrantRepository>,
        catalog: Arc<dyn CatalogRepository>,
        queue: Arc<dyn SyncQueue>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            grants,
            catalog,
            queue,
            audit,
        }
    }

    pub async fn handle(&self, cmd: CreateGrantCommand) -> Result<GrantId, DomainError> {
        let tier = self
            .catalog
            .find_tier(&cmd.tier_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::TierNotFound, "tier not found"))?;

        let mut grant = EntitlementGrant::new(
            cmd.subject_id.clone(),
            tier.id,
            tier.group_id.clone(),
            GrantStatus::Active,
            cmd.valid_from,
            cmd.valid_through,
            GrantSource::Manual,
            None,
        )
        .map_err(DomainError::from)?;
        if let Some(note) = cmd.note {
            grant.set_note(note);
        }

        self.grants.save(&grant).await?;

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
            AuditAction::GrantCreated,
            Some(grant.group_id.clone()),
            Some(grant.subject_id.clone()),
            serde_json::json!({
                "grant_id": grant.id.to_string(),
                "tier_id": grant.tier_id.to_string(),
                "source": "manual",
            }),
        );
        if let Err(e) = self.audit.append(record).await {
            tracing::warn!(error = %e, "audit append failed");
        }

        Ok(grant.id)
    }
}
