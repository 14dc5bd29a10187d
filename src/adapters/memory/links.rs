//! In-memory CustomerLinkRepository.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, GroupId, SubjectId};
use crate::domain::provider::Provider;
use crate::ports::{CustomerLink, CustomerLinkRepository};

#[derive(Default)]
pub struct InMemoryCustomerLinkRepository {
    links: RwLock<Vec<CustomerLink>>,
}

impl InMemoryCustomerLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerLinkRepository for InMemoryCustomerLinkRepository {
    async fn save(&self, link: &CustomerLink) -> Result<(), DomainError> {
        let mut links = self.links.write().await;
        match links.iter_mut().find(|l| {
            l.provider == link.provider
                && l.customer_id == link.customer_id
                && l.group_id == link.group_id
        }) {
            Some(existing) => *existing = link.clone(),
            None => links.push(link.clone()),
        }
        Ok(())
    }

    async fn find_subject(
        &self,
        provider: Provider,
        customer_id: &str,
        group_id: &GroupId,
    ) -> Result<Option<SubjectId>, DomainError> {
        Ok(self
            .links
            .read()
            .await
            .iter()
            .find(|l| {
                l.provider == provider && l.customer_id == customer_id && &l.group_id == group_id
            })
            .map(|l| l.subject_id.clone()))
    }
}
