//! In-memory GrantRepository.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entitlement::EntitlementGrant;
use crate::domain::foundation::{DomainError, ErrorCode, GrantId, GroupId, SubjectId, Timestamp};
use crate::domain::foundation::StateMachine;
use crate::domain::entitlement::GrantStatus;
use crate::domain::provider::Provider;
use crate::ports::GrantRepository;

#[derive(Default)]
pub struct InMemoryGrantRepository {
    grants: RwLock<Vec<EntitlementGrant>>,
}

impl InMemoryGrantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<EntitlementGrant> {
        self.grants.read().await.clone()
    }
}

#[async_trait]
impl GrantRepository for InMemoryGrantRepository {
    async fn save(&self, grant: &EntitlementGrant) -> Result<(), DomainError> {
        self.grants.write().await.push(grant.clone());
        Ok(())
    }

    async fn update(&self, grant: &EntitlementGrant) -> Result<(), DomainError> {
        let mut grants = self.grants.write().await;
        let stored = grants
            .iter_mut()
            .find(|g| g.id == grant.id)
            .ok_or_else(|| DomainError::new(ErrorCode::GrantNotFound, "grant not found"))?;
        *stored = grant.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &GrantId) -> Result<Option<EntitlementGrant>, DomainError> {
        Ok(self.grants.read().await.iter().find(|g| &g.id == id).cloned())
    }

    async fn find_by_source_ref(
        &self,
        provider: Provider,
        object_id: &str,
    ) -> Result<Option<EntitlementGrant>, DomainError> {
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .filter(|g| !g.status.is_terminal())
            .find(|g| {
                g.source_ref
                    .as_ref()
                    .is_some_and(|r| r.provider == provider && r.object_id == object_id)
            })
            .cloned())
    }

    async fn find_for_subject(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
    ) -> Result<Vec<EntitlementGrant>, DomainError> {
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .filter(|g| &g.group_id == group_id && &g.subject_id == subject_id)
            .cloned()
            .collect())
    }

    async fn find_for_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<EntitlementGrant>, DomainError> {
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .filter(|g| &g.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn list_expirable(
        &self,
        as_of: Timestamp,
        limit: u32,
    ) -> Result<Vec<EntitlementGrant>, DomainError> {
        let grants = self.grants.read().await;
        let mut expirable: Vec<_> = grants
            .iter()
            .filter(|g| {
                g.status.can_transition_to(&GrantStatus::Expired)
                    && g.valid_through.is_some_and(|t| !as_of.is_before(&t))
            })
            .cloned()
            .collect();
        expirable.sort_by_key(|g| g.valid_through);
        expirable.truncate(limit as usize);
        Ok(expirable)
    }
}
