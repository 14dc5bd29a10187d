//! PostgreSQL implementation of CustomerLinkRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, GroupId, SubjectId};
use crate::domain::provider::Provider;
use crate::ports::{CustomerLink, CustomerLinkRepository};

use super::database_error;

/// PostgreSQL implementation of the CustomerLinkRepository port.
pub struct PostgresCustomerLinkRepository {
    pool: PgPool,
}

impl PostgresCustomerLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerLinkRepository for PostgresCustomerLinkRepository {
    async fn save(&self, link: &CustomerLink) -> Result<(), DomainError> {
        // Re-linking the same processor customer within a group replaces
        // the subject; the composite key makes this an upsert.
        sqlx::query(
            r#"
            INSERT INTO customer_links (provider, customer_id, group_id, subject_id, linked_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (provider, customer_id, group_id) DO UPDATE SET
                subject_id = EXCLUDED.subject_id,
                linked_at = EXCLUDED.linked_at
            "#,
        )
        .bind(link.provider.as_str())
        .bind(&link.customer_id)
        .bind(link.group_id.as_str())
        .bind(link.subject_id.as_str())
        .bind(link.linked_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("save customer link", e))?;

        Ok(())
    }

    async fn find_subject(
        &self,
        provider: Provider,
        customer_id: &str,
        group_id: &GroupId,
    ) -> Result<Option<SubjectId>, DomainError> {
        let subject: Option<(String,)> = sqlx::query_as(
            "SELECT subject_id FROM customer_links \
             WHERE provider = $1 AND customer_id = $2 AND group_id = $3",
        )
        .bind(provider.as_str())
        .bind(customer_id)
        .bind(group_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find customer link", e))?;

        subject
            .map(|(s,)| {
                SubjectId::new(s)
                    .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))
            })
            .transpose()
    }
}
