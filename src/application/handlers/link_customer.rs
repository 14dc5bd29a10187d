//! LinkCustomerHandler - associates a processor customer with a subject.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, GroupId, SubjectId};
use crate::domain::provider::Provider;
use crate::ports::{AuditAction, AuditLog, AuditRecord, CustomerLink, CustomerLinkRepository};

#[derive(Debug, Clone)]
pub struct LinkCustomerCommand {
    pub provider: Provider,
    pub customer_id: String,
    pub group_id: GroupId,
    pub subject_id: SubjectId,
}

pub struct LinkCustomerHandler {
    links: Arc<dyn CustomerLinkRepository>,
    audit: Arc<dyn AuditLog>,
}

impl LinkCustomerHandler {
    pub fn new(links: Arc<dyn CustomerLinkRepository>, audit: Arc<dyn AuditLog>) -> Self {
        Self { links, audit }
    }

    pub async fn handle(&self, cmd: LinkCustomerCommand) -> Result<(), DomainError> {
        let link = CustomerLink::new(
            cmd.provider,
            cmd.customer_id.clone(),
            cmd.group_id.clone(),
            cmd.subject_id.clone(),
        );
        self.links.save(&link).await?;

        let record = AuditRecord::new(
            AuditAction::CustomerLinked,
            Some(cmd.group_id),
            Some(cmd.subject_id),
            serde_json::json!({
                "provider": cmd.provider.as_str(),
                "customer_id": cmd.customer_id,
            }),
        );
        if let Err(e) = self.audit.append(record).await {
            tracing::warn!(error = %e, "audit append failed");
        }
        Ok(())
    }
}
