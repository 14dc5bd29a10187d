//! SyncQueue port - durable queue of role reconciliation work.
//!
//! The claim operation is the concurrency linchpin: it must atomically
//! select the oldest pending request for a group and move it to
//! `InProgress`, so that two workers can never hold the same request and
//! at most one request per group is in flight at a time.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, GroupId, SyncRequestId};
use crate::domain::sync::RoleSyncRequest;

/// Port for the role sync work queue.
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Appends a pending request.
    async fn enqueue(&self, request: RoleSyncRequest) -> Result<(), DomainError>;

    /// Atomically claims the oldest pending request for the group, or
    /// returns `None` when the group has no pending work or already has
    /// a request in progress.
    async fn claim_next(&self, group_id: &GroupId)
        -> Result<Option<RoleSyncRequest>, DomainError>;

    /// Finishes a claimed request successfully.
    async fn complete(&self, id: &SyncRequestId) -> Result<(), DomainError>;

    /// Finishes a claimed request with a failure reason.
    async fn fail(&self, id: &SyncRequestId, error: &str) -> Result<(), DomainError>;

    async fn find(&self, id: &SyncRequestId) -> Result<Option<RoleSyncRequest>, DomainError>;

    /// Groups that currently have pending requests. Drives the worker's
    /// per-tick iteration without scanning every configured group.
    async fn groups_with_pending(&self) -> Result<Vec<GroupId>, DomainError>;

    /// Number of pending requests for one group.
    async fn pending_count(&self, group_id: &GroupId) -> Result<u64, DomainError>;
}
