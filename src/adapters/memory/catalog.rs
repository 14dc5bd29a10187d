//! In-memory CatalogRepository.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::catalog::{Group, Tier};
use crate::domain::foundation::{DomainError, GroupId, TierId};
use crate::domain::provider::Provider;
use crate::ports::CatalogRepository;

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    groups: RwLock<Vec<Group>>,
    tiers: RwLock<Vec<Tier>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_groups(&self) -> Result<Vec<Group>, DomainError> {
        Ok(self.groups.read().await.clone())
    }

    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, DomainError> {
        Ok(self.groups.read().await.iter().find(|g| &g.id == id).cloned())
    }

    async fn upsert_group(&self, group: &Group) -> Result<(), DomainError> {
        let mut groups = self.groups.write().await;
        match groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => *existing = group.clone(),
            None => groups.push(group.clone()),
        }
        Ok(())
    }

    async fn tiers_for_group(&self, group_id: &GroupId) -> Result<Vec<Tier>, DomainError> {
        Ok(self
            .tiers
            .read()
            .await
            .iter()
            .filter(|t| &t.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn find_tier(&self, id: &TierId) -> Result<Option<Tier>, DomainError> {
        Ok(self.tiers.read().await.iter().find(|t| &t.id == id).cloned())
    }

    async fn upsert_tier(&self, tier: &Tier) -> Result<(), DomainError> {
        let mut tiers = self.tiers.write().await;
        match tiers.iter_mut().find(|t| t.id == tier.id) {
            Some(existing) => *existing = tier.clone(),
            None => tiers.push(tier.clone()),
        }
        Ok(())
    }

    async fn find_tier_by_ref(
        &self,
        provider: Provider,
        reference: &str,
    ) -> Result<Option<Tier>, DomainError> {
        Ok(self
            .tiers
            .read()
            .await
            .iter()
            .find(|t| t.refs.matches(provider, reference))
            .cloned())
    }
}
