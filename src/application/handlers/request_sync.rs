//! RequestRoleSyncHandler - the `requestRoleSync` surface exposed to
//! operator tooling and platform-connection collaborators.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, GroupId, SyncRequestId};
use crate::domain::sync::{RoleSyncRequest, SyncOrigin, SyncScope};
use crate::ports::{AuditAction, AuditLog, AuditRecord, CatalogRepository, SyncQueue};

#[derive(Debug, Clone)]
pub struct RequestRoleSyncCommand {
    pub group_id: GroupId,
    pub scope: SyncScope,
    pub origin: SyncOrigin,
}

pub struct RequestRoleSyncHandler {
    catalog: Arc<dyn CatalogRepository>,
    queue: Arc<dyn SyncQueue>,
    audit: Arc<dyn AuditLog>,
}

impl RequestRoleSyncHandler {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        queue: Arc<dyn SyncQueue>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            catalog,
            queue,
            audit,
        }
    }

    pub async fn handle(&self, cmd: RequestRoleSyncCommand) -> Result<SyncRequestId, DomainError> {
        if self.catalog.find_group(&cmd.group_id).await?.is_none() {
            return Err(DomainError::new(ErrorCode::GroupNotFound, "group not found"));
        }

        let request = RoleSyncRequest::new(cmd.group_id.clone(), cmd.scope.clone(), cmd.origin);
        let id = request.id;
        self.queue.enqueue(request).await?;

        let record = AuditRecord::new(
            AuditAction::SyncRequested,
            Some(cmd.group_id),
            match &cmd.scope {
                SyncScope::Subject { subject_id } => Some(subject_id.clone()),
                SyncScope::Group => None,
            },
            serde_json::json!({
                "request_id": id.to_string(),
                "origin": cmd.origin,
            }),
        );
        if let Err(e) = self.audit.append(record).await {
            tracing::warn!(error = %e, "audit append failed");
        }

        Ok(id)
    }
}
