//! DesiredRolesQuery - "which roles should this subject hold right now".
//!
//! Desired roles are always derived at query time from effective grants;
//! nothing caches effectiveness, so a just-expired window or a revocation
//! is reflected immediately.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, GroupId, RoleId, SubjectId, Timestamp};
use crate::ports::{CatalogRepository, GrantRepository};

pub struct DesiredRolesQuery {
    grants: Arc<dyn GrantRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

impl DesiredRolesQuery {
    pub fn new(grants: Arc<dyn GrantRepository>, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { grants, catalog }
    }

    /// Union of role ids across all tiers backed by an effective grant.
    pub async fn desired_roles(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
        now: Timestamp,
    ) -> Result<BTreeSet<RoleId>, DomainError> {
        let grants = self.grants.find_for_subject(group_id, subject_id).await?;
        let mut roles = BTreeSet::new();

        for grant in grants.iter().filter(|g| g.is_effective(now)) {
            if let Some(tier) = self.catalog.find_tier(&grant.tier_id).await? {
                roles.extend(tier.role_ids.iter().cloned());
            }
        }
        Ok(roles)
    }

    /// Every role id any tier of the group manages. The sync worker only
    /// ever touches roles in this set.
    pub async fn managed_roles(&self, group_id: &GroupId) -> Result<BTreeSet<RoleId>, DomainError> {
        let tiers = self.catalog.tiers_for_group(group_id).await?;
        Ok(tiers
            .into_iter()
            .flat_map(|t| t.role_ids.into_iter())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCatalogRepository, InMemoryGrantRepository};
    use crate::domain::catalog::{EntitlementPolicy, ProcessorRefs, Tier};
    use crate::domain::entitlement::{EntitlementGrant, GrantSource, GrantStatus};
    use crate::domain::foundation::TierId;
    use crate::ports::GrantRepository as _;

    fn group() -> GroupId {
        GroupId::new("812345678901234567").unwrap()
    }

    fn subject() -> SubjectId {
        SubjectId::new("100000000000000001").unwrap()
    }

    fn role(id: &str) -> RoleId {
        RoleId::new(id).unwrap()
    }

    async fn tier_with_role(catalog: &InMemoryCatalogRepository, role_id: &str) -> TierId {
        let id = TierId::new();
        catalog
            .upsert_tier(
                &Tier::new(
                    id,
                    group(),
                    format!("tier-{role_id}"),
                    vec![role(role_id)],
                    EntitlementPolicy::OneTime { duration_days: None },
                    ProcessorRefs::default(),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        id
    }

    async fn grant(
        grants: &InMemoryGrantRepository,
        tier_id: TierId,
        status: GrantStatus,
        valid_through: Option<Timestamp>,
    ) {
        let mut g = EntitlementGrant::new(
            subject(),
            tier_id,
            group(),
            GrantStatus::Active,
            Timestamp::now().add_days(-1),
            valid_through,
            GrantSource::Manual,
            None,
        )
        .unwrap();
        if status != GrantStatus::Active {
            g.transition(status).unwrap();
        }
        grants.save(&g).await.unwrap();
    }

    #[tokio::test]
    async fn unions_roles_across_effective_grants() {
        let grants = Arc::new(InMemoryGrantRepository::new());
        let catalog = Arc::new(InMemoryCatalogRepository::new());
        let gold = tier_with_role(&catalog, "900000000000000001").await;
        let beta = tier_with_role(&catalog, "900000000000000002").await;
        grant(&grants, gold, GrantStatus::Active, None).await;
        grant(&grants, beta, GrantStatus::PastDue, None).await;

        let query = DesiredRolesQuery::new(grants, catalog);
        let roles = query
            .desired_roles(&group(), &subject(), Timestamp::now())
            .await
            .unwrap();

        // PastDue still grants access inside the grace window.
        assert_eq!(roles.len(), 2);
    }

    #[tokio::test]
    async fn revoked_and_expired_grants_contribute_nothing() {
        let grants = Arc::new(InMemoryGrantRepository::new());
        let catalog = Arc::new(InMemoryCatalogRepository::new());
        let gold = tier_with_role(&catalog, "900000000000000001").await;
        let beta = tier_with_role(&catalog, "900000000000000002").await;
        grant(&grants, gold, GrantStatus::Canceled, None).await;
        // Window closed yesterday.
        grant(
            &grants,
            beta,
            GrantStatus::Active,
            Some(Timestamp::now().add_secs(-3600)),
        )
        .await;

        let query = DesiredRolesQuery::new(grants, catalog);
        let roles = query
            .desired_roles(&group(), &subject(), Timestamp::now())
            .await
            .unwrap();

        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn managed_roles_cover_every_tier() {
        let grants = Arc::new(InMemoryGrantRepository::new());
        let catalog = Arc::new(InMemoryCatalogRepository::new());
        tier_with_role(&catalog, "900000000000000001").await;
        tier_with_role(&catalog, "900000000000000002").await;

        let query = DesiredRolesQuery::new(grants, catalog);
        let managed = query.managed_roles(&group()).await.unwrap();
        assert_eq!(managed.len(), 2);
    }
}
