//! Entitlement grant aggregate.
//!
//! The ground truth of "subject X has tier Y access". Grants are created
//! by checkout completion, manual action, or event reconciliation; mutated
//! only through status transitions; never hard-deleted.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    GrantId, GroupId, StateMachine, SubjectId, TierId, Timestamp, ValidationError,
};
use crate::domain::provider::Provider;

use super::status::GrantStatus;

/// How a grant came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    /// Created when a checkout completed.
    Checkout,
    /// Created by an operator.
    Manual,
    /// Created or mutated by provider-event reconciliation.
    Reconciliation,
}

/// Processor object backing a grant, kept for incident reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub provider: Provider,
    /// Processor object id (subscription, charge, order).
    pub object_id: String,
}

/// A time-bounded record that a subject holds tier access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementGrant {
    pub id: GrantId,
    pub subject_id: SubjectId,
    pub tier_id: TierId,
    pub group_id: GroupId,
    pub status: GrantStatus,

    /// Start of the validity window.
    pub valid_from: Timestamp,

    /// End of the validity window; `None` means lifetime.
    pub valid_through: Option<Timestamp>,

    pub source: GrantSource,
    pub source_ref: Option<SourceRef>,

    /// Operator-facing note, updated on revocation.
    pub note: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntitlementGrant {
    /// Creates a grant, validating the validity window ordering.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subject_id: SubjectId,
        tier_id: TierId,
        group_id: GroupId,
        status: GrantStatus,
        valid_from: Timestamp,
        valid_through: Option<Timestamp>,
        source: GrantSource,
        source_ref: Option<SourceRef>,
    ) -> Result<Self, ValidationError> {
        Self::check_window(valid_from, valid_through)?;

        let now = Timestamp::now();
        Ok(Self {
            id: GrantId::new(),
            subject_id,
            tier_id,
            group_id,
            status,
            valid_from,
            valid_through,
            source,
            source_ref,
            note: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn check_window(
        valid_from: Timestamp,
        valid_through: Option<Timestamp>,
    ) -> Result<(), ValidationError> {
        if let Some(through) = valid_through {
            if !through.is_after(&valid_from) {
                return Err(ValidationError::invalid_format(
                    "valid_through",
                    "validity window end must be after its start",
                ));
            }
        }
        Ok(())
    }

    /// Derived effectiveness: status grants access and `now` is inside
    /// the validity window. Never cached.
    pub fn is_effective(&self, now: Timestamp) -> bool {
        if !self.status.grants_access() {
            return false;
        }
        if now.is_before(&self.valid_from) {
            return false;
        }
        match self.valid_through {
            Some(through) => now.is_before(&through),
            None => true,
        }
    }

    /// Transitions the grant status, enforcing the state machine.
    pub fn transition(&mut self, target: GrantStatus) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(target)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Extends the validity window end, keeping the ordering invariant.
    ///
    /// Used on subscription renewal. A shorter window than the current one
    /// is ignored, so replayed renewal events cannot shrink access.
    pub fn extend_through(&mut self, through: Timestamp) -> Result<(), ValidationError> {
        Self::check_window(self.valid_from, Some(through))?;
        match self.valid_through {
            Some(current) if through.is_before(&current) => {}
            _ => {
                self.valid_through = Some(through);
                self.updated_at = Timestamp::now();
            }
        }
        Ok(())
    }

    /// Records a revocation note without touching status.
    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = Some(note.into());
        self.updated_at = Timestamp::now();
    }
}
