//! ApplyProviderEventHandler - reconciles one normalized payment event
//! into the entitlement ledger.
//!
//! Writes are idempotent per event: the caller only invokes this for a
//! first-time insert, and every mutation is expressed through the grant
//! state machine plus the never-shrinking window extension, so replays and
//! out-of-order deliveries cannot corrupt the ledger. Transitions the
//! state machine rejects are recorded as ignored, not errors.

use std::sync::Arc;

use crate::domain::catalog::{EntitlementPolicy, Tier};
use crate::domain::entitlement::{EntitlementGrant, GrantSource, GrantStatus, SourceRef};
use crate::domain::foundation::{DomainError, GrantId, GroupId, SubjectId, Timestamp};
use crate::domain::provider::{CanonicalEventKind, NormalizedEvent};
use crate::domain::sync::{RoleSyncRequest, SyncOrigin, SyncScope};
use crate::ports::{
    AuditAction, AuditLog, AuditRecord, CatalogRepository, CustomerLinkRepository, GrantRepository,
    SyncQueue,
};

/// Fallback billing period used when a subscription event arrives without
/// a period end; the next invoice corrects the window.
const DEFAULT_PERIOD_DAYS: i64 = 30;

/// How reconciliation landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The ledger changed and a sync request was enqueued.
    Applied { grant_id: GrantId },
    /// The event is authentic but deliberately has no effect (out-of-order
    /// transition, nothing left to revoke). Marked processed.
    Ignored { reason: String },
    /// The event could not be correlated to a subject, tier, or grant.
    /// Marked failed so operators can fix the missing link.
    Unmatched { reason: String },
}

/// Applies canonical payment events to the entitlement ledger.
pub struct ApplyProviderEventHandler {
    grants: Arc<dyn GrantRepository>,
    links: Arc<dyn CustomerLinkRepository>,
    catalog: Arc<dyn CatalogRepository>,
    queue: Arc<dyn SyncQueue>,
    audit: Arc<dyn AuditLog>,
}

impl ApplyProviderEventHandler {
    pub fn new(
        grants: Arc<dyn GrantRepository>,
        links: Arc<dyn CustomerLinkRepository>,
        catalog: Arc<dyn CatalogRepository>,
        queue: Arc<dyn SyncQueue>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            grants,
            links,
            catalog,
            queue,
            audit,
        }
    }

    pub async fn handle(&self, event: &NormalizedEvent) -> Result<ApplyOutcome, DomainError> {
        use CanonicalEventKind::*;

        match event.kind {
            PaymentSucceeded | SubscriptionActive => self.apply_activation(event).await,
            PaymentFailed | SubscriptionPastDue => {
                self.apply_transition(event, GrantStatus::PastDue, AuditAction::GrantStatusChanged)
                    .await
            }
            SubscriptionCanceled | RefundIssued => {
                self.apply_revocation(event, GrantStatus::Canceled).await
            }
            ChargebackOpened => {
                self.apply_revocation(event, GrantStatus::SuspendedDispute)
                    .await
            }
            ChargebackClosed => self.apply_dispute_closed(event).await,
        }
    }

    /// Creates a new Active grant or extends the one already backing the
    /// processor object.
    async fn apply_activation(
        &self,
        event: &NormalizedEvent,
    ) -> Result<ApplyOutcome, DomainError> {
        if let Some(existing) = self.find_by_source(event).await? {
            return self.extend_existing(event, existing).await;
        }

        let Some(tier) = self.resolve_tier(event).await? else {
            return Ok(ApplyOutcome::Unmatched {
                reason: format!(
                    "no tier matches {} references {:?}",
                    event.provider, event.price_ids
                ),
            });
        };
        let Some(subject_id) = self.resolve_subject(event, &tier.group_id).await? else {
            return Ok(ApplyOutcome::Unmatched {
                reason: match &event.customer_id {
                    Some(c) => format!("no subject linked to {} customer {c}", event.provider),
                    None => "event carries no customer id".to_string(),
                },
            });
        };

        let valid_from = event.occurred_at.unwrap_or_else(Timestamp::now);
        let valid_through = entitlement_window_end(&tier.policy, valid_from, event.period_end);

        let grant = EntitlementGrant::new(
            subject_id.clone(),
            tier.id,
            tier.group_id.clone(),
            GrantStatus::Active,
            valid_from,
            valid_through,
            GrantSource::Reconciliation,
            event.object_id.as_ref().map(|object_id| SourceRef {
                provider: event.provider,
                object_id: object_id.clone(),
            }),
        )
        .map_err(DomainError::from)?;

        self.grants.save(&grant).await?;
        self.enqueue_subject_sync(&grant).await?;
        self.write_audit(AuditAction::GrantCreated, &grant, event).await;

        Ok(ApplyOutcome::Applied { grant_id: grant.id })
    }

    /// Re-activates and/or extends a grant already tied to this processor
    /// object. Renewal replays are safe because the window never shrinks.
    async fn extend_existing(
        &self,
        event: &NormalizedEvent,
        mut grant: EntitlementGrant,
    ) -> Result<ApplyOutcome, DomainError> {
        if grant.status != GrantStatus::Active {
            if let Err(e) = grant.transition(GrantStatus::Active) {
                return self.record_ignored(event, e.to_string()).await;
            }
        }

        let tier = self.catalog.find_tier(&grant.tier_id).await?;
        let policy = tier.map(|t| t.policy).unwrap_or(EntitlementPolicy::Subscription {
            grace_days: 0,
        });
        if let Some(end) = entitlement_window_end(&policy, grant.valid_from, event.period_end) {
            grant.extend_through(end).map_err(DomainError::from)?;
        }

        self.grants.update(&grant).await?;
        self.enqueue_subject_sync(&grant).await?;
        self.write_audit(AuditAction::GrantExtended, &grant, event).await;

        Ok(ApplyOutcome::Applied { grant_id: grant.id })
    }

    /// Moves the matched grant to `target`, tolerating out-of-order
    /// deliveries the state machine rejects.
    async fn apply_transition(
        &self,
        event: &NormalizedEvent,
        target: GrantStatus,
        action: AuditAction,
    ) -> Result<ApplyOutcome, DomainError> {
        let Some(mut grant) = self.find_grant(event).await? else {
            return Ok(ApplyOutcome::Unmatched {
                reason: format!("no grant matches {} object {:?}", event.provider, event.object_id),
            });
        };

        if grant.status == target {
            return self
                .record_ignored(event, format!("grant already {:?}", target))
                .await;
        }
        if let Err(e) = grant.transition(target) {
            return self.record_ignored(event, e.to_string()).await;
        }

        self.grants.update(&grant).await?;
        self.enqueue_subject_sync(&grant).await?;
        self.write_audit(action, &grant, event).await;

        Ok(ApplyOutcome::Applied { grant_id: grant.id })
    }

    /// Like `apply_transition`, but a missing grant is a no-op rather than
    /// a correlation failure: revoking nothing is already revoked.
    async fn apply_revocation(
        &self,
        event: &NormalizedEvent,
        target: GrantStatus,
    ) -> Result<ApplyOutcome, DomainError> {
        if self.find_grant(event).await?.is_none() {
            return self
                .record_ignored(event, "no active grant to revoke".to_string())
                .await;
        }
        let action = match target {
            GrantStatus::Canceled => AuditAction::GrantRevoked,
            _ => AuditAction::GrantStatusChanged,
        };
        self.apply_transition(event, target, action).await
    }

    /// A closed chargeback restores access only from the suspended state;
    /// any other state means the dispute outcome is already reflected.
    async fn apply_dispute_closed(
        &self,
        event: &NormalizedEvent,
    ) -> Result<ApplyOutcome, DomainError> {
        let Some(grant) = self.find_grant(event).await? else {
            return self
                .record_ignored(event, "no grant under dispute".to_string())
                .await;
        };
        if grant.status != GrantStatus::SuspendedDispute {
            return self
                .record_ignored(
                    event,
                    format!("dispute closed but grant is {:?}", grant.status),
                )
                .await;
        }
        self.apply_transition(event, GrantStatus::Active, AuditAction::GrantStatusChanged)
            .await
    }

    async fn find_by_source(
        &self,
        event: &NormalizedEvent,
    ) -> Result<Option<EntitlementGrant>, DomainError> {
        match &event.object_id {
            Some(object_id) => self.grants.find_by_source_ref(event.provider, object_id).await,
            None => Ok(None),
        }
    }

    /// Source-ref lookup first; falls back to the subject's most recently
    /// touched non-terminal grant on the matched tier.
    async fn find_grant(
        &self,
        event: &NormalizedEvent,
    ) -> Result<Option<EntitlementGrant>, DomainError> {
        if let Some(grant) = self.find_by_source(event).await? {
            return Ok(Some(grant));
        }

        let Some(tier) = self.resolve_tier(event).await? else {
            return Ok(None);
        };
        let Some(subject_id) = self.resolve_subject(event, &tier.group_id).await? else {
            return Ok(None);
        };

        let mut candidates: Vec<_> = self
            .grants
            .find_for_subject(&tier.group_id, &subject_id)
            .await?
            .into_iter()
            .filter(|g| g.tier_id == tier.id && !matches!(g.status, GrantStatus::Canceled | GrantStatus::Expired))
            .collect();
        candidates.sort_by_key(|g| g.updated_at);
        Ok(candidates.pop())
    }

    async fn resolve_tier(&self, event: &NormalizedEvent) -> Result<Option<Tier>, DomainError> {
        for reference in &event.price_ids {
            if let Some(tier) = self
                .catalog
                .find_tier_by_ref(event.provider, reference)
                .await?
            {
                return Ok(Some(tier));
            }
        }
        Ok(None)
    }

    async fn resolve_subject(
        &self,
        event: &NormalizedEvent,
        group_id: &GroupId,
    ) -> Result<Option<SubjectId>, DomainError> {
        match &event.customer_id {
            Some(customer_id) => {
                self.links
                    .find_subject(event.provider, customer_id, group_id)
                    .await
            }
            None => Ok(None),
        }
    }

    async fn enqueue_subject_sync(&self, grant: &EntitlementGrant) -> Result<(), DomainError> {
        let request = RoleSyncRequest::new(
            grant.group_id.clone(),
            SyncScope::Subject {
                subject_id: grant.subject_id.clone(),
            },
            SyncOrigin::EntitlementChange,
        );
        self.queue.enqueue(request).await
    }

    async fn record_ignored(
        &self,
        event: &NormalizedEvent,
        reason: String,
    ) -> Result<ApplyOutcome, DomainError> {
        let record = AuditRecord::new(
            AuditAction::EventIgnored,
            None,
            None,
            serde_json::json!({
                "provider": event.provider.as_str(),
                "kind": event.kind.as_str(),
                "reason": reason,
            }),
        )
        .correlated_to(event.event_id.clone());
        if let Err(e) = self.audit.append(record).await {
            tracing::warn!(error = %e, "audit append failed");
        }
        Ok(ApplyOutcome::Ignored { reason })
    }

    async fn write_audit(
        &self,
        action: AuditAction,
        grant: &EntitlementGrant,
        event: &NormalizedEvent,
    ) {
        let record = AuditRecord::new(
            action,
            Some(grant.group_id.clone()),
            Some(grant.subject_id.clone()),
            serde_json::json!({
                "grant_id": grant.id.to_string(),
                "status": grant.status,
                "provider": event.provider.as_str(),
                "kind": event.kind.as_str(),
            }),
        )
        .correlated_to(event.event_id.clone());
        if let Err(e) = self.audit.append(record).await {
            tracing::warn!(error = %e, "audit append failed");
        }
    }
}

/// Computes the validity window end a policy implies.
fn entitlement_window_end(
    policy: &EntitlementPolicy,
    valid_from: Timestamp,
    period_end: Option<Timestamp>,
) -> Option<Timestamp> {
    match policy {
        EntitlementPolicy::Subscription { grace_days } => {
            let end = period_end.unwrap_or_else(|| valid_from.add_days(DEFAULT_PERIOD_DAYS));
            Some(end.add_days(*grace_days as i64))
        }
        EntitlementPolicy::OneTime { duration_days } => {
            duration_days.map(|days| valid_from.add_days(days as i64))
        }
    }
}
