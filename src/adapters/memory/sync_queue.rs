//! In-memory SyncQueue.
//!
//! Mirrors the storage adapter's claim semantics: oldest pending first,
//! and no claim while the group already has a request in progress.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, GroupId, SyncRequestId};
use crate::domain::sync::{RoleSyncRequest, SyncRequestStatus};
use crate::ports::SyncQueue;

#[derive(Default)]
pub struct InMemorySyncQueue {
    requests: RwLock<Vec<RoleSyncRequest>>,
}

impl InMemorySyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<RoleSyncRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl SyncQueue for InMemorySyncQueue {
    async fn enqueue(&self, request: RoleSyncRequest) -> Result<(), DomainError> {
        self.requests.write().await.push(request);
        Ok(())
    }

    async fn claim_next(
        &self,
        group_id: &GroupId,
    ) -> Result<Option<RoleSyncRequest>, DomainError> {
        let mut requests = self.requests.write().await;

        let group_has_in_flight = requests
            .iter()
            .any(|r| &r.group_id == group_id && r.status == SyncRequestStatus::InProgress);
        if group_has_in_flight {
            return Ok(None);
        }

        let next = requests
            .iter_mut()
            .filter(|r| &r.group_id == group_id && r.status == SyncRequestStatus::Pending)
            .min_by_key(|r| r.requested_at);

        match next {
            Some(request) => {
                request
                    .claim()
                    .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
                Ok(Some(request.clone()))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, id: &SyncRequestId) -> Result<(), DomainError> {
        self.finish(id, None).await
    }

    async fn fail(&self, id: &SyncRequestId, error: &str) -> Result<(), DomainError> {
        self.finish(id, Some(error.to_string())).await
    }

    async fn find(&self, id: &SyncRequestId) -> Result<Option<RoleSyncRequest>, DomainError> {
        Ok(self.requests.read().await.iter().find(|r| &r.id == id).cloned())
    }

    async fn groups_with_pending(&self) -> Result<Vec<GroupId>, DomainError> {
        let requests = self.requests.read().await;
        let mut groups: Vec<GroupId> = Vec::new();
        for request in requests
            .iter()
            .filter(|r| r.status == SyncRequestStatus::Pending)
        {
            if !groups.contains(&request.group_id) {
                groups.push(request.group_id.clone());
            }
        }
        Ok(groups)
    }

    async fn pending_count(&self, group_id: &GroupId) -> Result<u64, DomainError> {
        Ok(self
            .requests
            .read()
            .await
            .iter()
            .filter(|r| &r.group_id == group_id && r.status == SyncRequestStatus::Pending)
            .count() as u64)
    }
}

impl InMemorySyncQueue {
    async fn finish(&self, id: &SyncRequestId, error: Option<String>) -> Result<(), DomainError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| DomainError::new(ErrorCode::SyncRequestNotFound, "request not found"))?;
        let result = match error {
            Some(e) => request.fail(e),
            None => request.complete(),
        };
        result.map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))
    }
}
