//! In-memory AuditLog.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, GroupId};
use crate::ports::{AuditLog, AuditRecord};

#[derive(Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, record: AuditRecord) -> Result<(), DomainError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn recent(
        &self,
        group_id: &GroupId,
        limit: u32,
    ) -> Result<Vec<AuditRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.group_id.as_ref() == Some(group_id))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
