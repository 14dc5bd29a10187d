//! CatalogRepository port - groups, tiers, and reference lookup.

use async_trait::async_trait;

use crate::domain::catalog::{Group, Tier};
use crate::domain::foundation::{DomainError, GroupId, TierId};
use crate::domain::provider::Provider;

/// Port for the group and tier catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<Group>, DomainError>;

    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, DomainError>;

    async fn upsert_group(&self, group: &Group) -> Result<(), DomainError>;

    async fn tiers_for_group(&self, group_id: &GroupId) -> Result<Vec<Tier>, DomainError>;

    async fn find_tier(&self, id: &TierId) -> Result<Option<Tier>, DomainError>;

    async fn upsert_tier(&self, tier: &Tier) -> Result<(), DomainError>;

    /// Tier whose processor references match the given price, checkout, or
    /// item id. This is how an incoming payment event finds its tier.
    async fn find_tier_by_ref(
        &self,
        provider: Provider,
        reference: &str,
    ) -> Result<Option<Tier>, DomainError>;
}
