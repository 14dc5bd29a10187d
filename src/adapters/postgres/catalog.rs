//! PostgreSQL implementation of CatalogRepository.
//!
//! Policies and processor references are stored as JSONB: both are small
//! tagged value objects whose shape belongs to the domain, and neither is
//! queried by column. Reference lookup loads the (small) tier catalog and
//! matches in process rather than pushing the tagged shape into SQL.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::catalog::{EntitlementPolicy, Group, ProcessorRefs, Tier};
use crate::domain::foundation::{DomainError, ErrorCode, GroupId, RoleId, TierId};
use crate::domain::provider::Provider;
use crate::ports::CatalogRepository;

use super::database_error;

const TIER_COLUMNS: &str = "id, group_id, name, role_ids, policy, refs";

/// PostgreSQL implementation of the CatalogRepository port.
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    id: String,
    name: String,
}

impl TryFrom<GroupRow> for Group {
    type Error = DomainError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        let id = GroupId::new(row.id)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;
        Ok(Group::new(id, row.name))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TierRow {
    id: Uuid,
    group_id: String,
    name: String,
    role_ids: Vec<String>,
    policy: Json<EntitlementPolicy>,
    refs: Json<ProcessorRefs>,
}

impl TryFrom<TierRow> for Tier {
    type Error = DomainError;

    fn try_from(row: TierRow) -> Result<Self, Self::Error> {
        let group_id = GroupId::new(row.group_id)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;
        let role_ids = row
            .role_ids
            .into_iter()
            .map(|id| {
                RoleId::new(id)
                    .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Re-validates the policy/reference invariant on the way out, so a
        // hand-edited row cannot smuggle an illegal combination in.
        Tier::new(
            TierId::from_uuid(row.id),
            group_id,
            row.name,
            role_ids,
            row.policy.0,
            row.refs.0,
        )
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn list_groups(&self) -> Result<Vec<Group>, DomainError> {
        let rows: Vec<GroupRow> = sqlx::query_as("SELECT id, name FROM groups ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error("list groups", e))?;

        rows.into_iter().map(Group::try_from).collect()
    }

    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, DomainError> {
        let row: Option<GroupRow> = sqlx::query_as("SELECT id, name FROM groups WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("find group", e))?;

        row.map(Group::try_from).transpose()
    }

    async fn upsert_group(&self, group: &Group) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO groups (id, name) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(group.id.as_str())
        .bind(&group.name)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("upsert group", e))?;

        Ok(())
    }

    async fn tiers_for_group(&self, group_id: &GroupId) -> Result<Vec<Tier>, DomainError> {
        let rows: Vec<TierRow> = sqlx::query_as(&format!(
            "SELECT {TIER_COLUMNS} FROM tiers WHERE group_id = $1 ORDER BY name ASC"
        ))
        .bind(group_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("list tiers for group", e))?;

        rows.into_iter().map(Tier::try_from).collect()
    }

    async fn find_tier(&self, id: &TierId) -> Result<Option<Tier>, DomainError> {
        let row: Option<TierRow> = sqlx::query_as(&format!(
            "SELECT {TIER_COLUMNS} FROM tiers WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find tier", e))?;

        row.map(Tier::try_from).transpose()
    }

    async fn upsert_tier(&self, tier: &Tier) -> Result<(), DomainError> {
        let role_ids: Vec<&str> = tier.role_ids.iter().map(|r| r.as_str()).collect();

        sqlx::query(
            r#"
            INSERT INTO tiers (id, group_id, name, role_ids, policy, refs)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                role_ids = EXCLUDED.role_ids,
                policy = EXCLUDED.policy,
                refs = EXCLUDED.refs
            "#,
        )
        .bind(tier.id.as_uuid())
        .bind(tier.group_id.as_str())
        .bind(&tier.name)
        .bind(&role_ids)
        .bind(Json(&tier.policy))
        .bind(Json(&tier.refs))
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("upsert tier", e))?;

        Ok(())
    }

    async fn find_tier_by_ref(
        &self,
        provider: Provider,
        reference: &str,
    ) -> Result<Option<Tier>, DomainError> {
        let rows: Vec<TierRow> = sqlx::query_as(&format!(
            "SELECT {TIER_COLUMNS} FROM tiers"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("find tier by ref", e))?;

        for row in rows {
            let tier = Tier::try_from(row)?;
            if tier.refs.matches(provider, reference) {
                return Ok(Some(tier));
            }
        }
        Ok(None)
    }
}
