//! GrantRepository port - persistence seam for the entitlement ledger.

use async_trait::async_trait;

use crate::domain::entitlement::EntitlementGrant;
use crate::domain::foundation::{DomainError, GrantId, GroupId, SubjectId, Timestamp};
use crate::domain::provider::Provider;

/// Port for storing and querying entitlement grants.
///
/// Grants are never deleted; revocation and expiry are status transitions
/// applied through `update`.
#[async_trait]
pub trait GrantRepository: Send + Sync {
    /// Inserts a new grant.
    async fn save(&self, grant: &EntitlementGrant) -> Result<(), DomainError>;

    /// Persists changes to an existing grant.
    async fn update(&self, grant: &EntitlementGrant) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &GrantId) -> Result<Option<EntitlementGrant>, DomainError>;

    /// Non-terminal grant backed by the given processor object, if any.
    /// Reconciliation uses this to route subscription lifecycle events to
    /// the grant they concern.
    async fn find_by_source_ref(
        &self,
        provider: Provider,
        object_id: &str,
    ) -> Result<Option<EntitlementGrant>, DomainError>;

    /// Every grant a subject holds in a group, regardless of status.
    async fn find_for_subject(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
    ) -> Result<Vec<EntitlementGrant>, DomainError>;

    /// Every grant in a group, regardless of status.
    async fn find_for_group(&self, group_id: &GroupId)
        -> Result<Vec<EntitlementGrant>, DomainError>;

    /// Grants whose validity window has closed but whose status still
    /// permits the Expired transition, oldest first, bounded by `limit`.
    async fn list_expirable(
        &self,
        as_of: Timestamp,
        limit: u32,
    ) -> Result<Vec<EntitlementGrant>, DomainError>;
}
