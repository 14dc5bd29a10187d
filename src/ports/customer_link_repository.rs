//! CustomerLinkRepository port - processor customer to platform subject.
//!
//! Payment events carry processor-side customer ids. The link table is the
//! only bridge from those ids to platform subjects; events arriving for an
//! unlinked customer are recorded but cannot affect the ledger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, GroupId, SubjectId, Timestamp};
use crate::domain::provider::Provider;

/// One (provider, customer id) to subject association, scoped per group so
/// the same processor customer can map to different subjects in different
/// communities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerLink {
    pub provider: Provider,
    pub customer_id: String,
    pub group_id: GroupId,
    pub subject_id: SubjectId,
    pub linked_at: Timestamp,
}

impl CustomerLink {
    pub fn new(
        provider: Provider,
        customer_id: impl Into<String>,
        group_id: GroupId,
        subject_id: SubjectId,
    ) -> Self {
        Self {
            provider,
            customer_id: customer_id.into(),
            group_id,
            subject_id,
            linked_at: Timestamp::now(),
        }
    }
}

/// Port for the customer link table.
#[async_trait]
pub trait CustomerLinkRepository: Send + Sync {
    /// Upserts a link. A repeated link for the same (provider, customer,
    /// group) replaces the subject, covering account re-links.
    async fn save(&self, link: &CustomerLink) -> Result<(), DomainError>;

    /// Subject linked to a processor customer within a group, if any.
    async fn find_subject(
        &self,
        provider: Provider,
        customer_id: &str,
        group_id: &GroupId,
    ) -> Result<Option<SubjectId>, DomainError>;
}
