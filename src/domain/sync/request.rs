//! Role sync request work items.
//!
//! A request asks the worker to reconcile platform roles against the
//! entitlement ledger for a whole group or a single subject. The status
//! field is the durable claim: a request is atomically moved to
//! `InProgress` before any external I/O, so the single-claimer guarantee
//! survives restarts and horizontal scaling.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GroupId, StateMachine, SubjectId, SyncRequestId, Timestamp};

/// What the request covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum SyncScope {
    /// Reconcile every member of the group.
    Group,
    /// Reconcile a single subject.
    Subject { subject_id: SubjectId },
}

/// Why the request was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOrigin {
    /// Operator-initiated force sync.
    Manual,
    /// First sync after a group was connected.
    Bootstrap,
    /// Triggered by an entitlement ledger change.
    EntitlementChange,
}

/// Work item lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRequestStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StateMachine for SyncRequestStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SyncRequestStatus::*;
        matches!(
            (self, target),
            (Pending, InProgress) | (InProgress, Completed) | (InProgress, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SyncRequestStatus::*;
        match self {
            Pending => vec![InProgress],
            InProgress => vec![Completed, Failed],
            Completed => vec![],
            Failed => vec![],
        }
    }
}

/// A queued unit of role reconciliation work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSyncRequest {
    pub id: SyncRequestId,
    pub group_id: GroupId,
    pub scope: SyncScope,
    pub origin: SyncOrigin,
    pub status: SyncRequestStatus,

    /// Human-readable failure reason, set when status is Failed.
    pub error: Option<String>,

    pub requested_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

impl RoleSyncRequest {
    /// Creates a pending request.
    pub fn new(group_id: GroupId, scope: SyncScope, origin: SyncOrigin) -> Self {
        Self {
            id: SyncRequestId::new(),
            group_id,
            scope,
            origin,
            status: SyncRequestStatus::Pending,
            error: None,
            requested_at: Timestamp::now(),
            claimed_at: None,
            finished_at: None,
        }
    }

    /// Marks the request claimed by a worker.
    pub fn claim(&mut self) -> Result<(), crate::domain::foundation::ValidationError> {
        self.status = self.status.transition_to(SyncRequestStatus::InProgress)?;
        self.claimed_at = Some(Timestamp::now());
        Ok(())
    }

    /// Marks the request completed.
    pub fn complete(&mut self) -> Result<(), crate::domain::foundation::ValidationError> {
        self.status = self.status.transition_to(SyncRequestStatus::Completed)?;
        self.finished_at = Some(Timestamp::now());
        Ok(())
    }

    /// Marks the request failed with a human-readable reason.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
    ) -> Result<(), crate::domain::foundation::ValidationError> {
        self.status = self.status.transition_to(SyncRequestStatus::Failed)?;
        self.error = Some(error.into());
        self.finished_at = Some(Timestamp::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> GroupId {
        GroupId::new("812345678901234567").unwrap()
    }

    #[test]
    fn lifecycle_pending_to_completed() {
        let mut request = RoleSyncRequest::new(group(), SyncScope::Group, SyncOrigin::Manual);
        assert_eq!(request.status, SyncRequestStatus::Pending);

        request.claim().unwrap();
        assert_eq!(request.status, SyncRequestStatus::InProgress);
        assert!(request.claimed_at.is_some());

        request.complete().unwrap();
        assert_eq!(request.status, SyncRequestStatus::Completed);
        assert!(request.finished_at.is_some());
    }

    #[test]
    fn failure_records_the_reason() {
        let mut request = RoleSyncRequest::new(
            group(),
            SyncScope::Subject {
                subject_id: SubjectId::new("100000000000000001").unwrap(),
            },
            SyncOrigin::EntitlementChange,
        );
        request.claim().unwrap();
        request.fail("missing manage-roles permission").unwrap();

        assert_eq!(request.status, SyncRequestStatus::Failed);
        assert_eq!(
            request.error.as_deref(),
            Some("missing manage-roles permission")
        );
    }

    #[test]
    fn cannot_complete_without_claiming() {
        let mut request = RoleSyncRequest::new(group(), SyncScope::Group, SyncOrigin::Bootstrap);
        assert!(request.complete().is_err());
    }

    #[test]
    fn cannot_claim_twice() {
        let mut request = RoleSyncRequest::new(group(), SyncScope::Group, SyncOrigin::Manual);
        request.claim().unwrap();
        assert!(request.claim().is_err());
    }

    #[test]
    fn terminal_states_cannot_move() {
        assert!(SyncRequestStatus::Completed.is_terminal());
        assert!(SyncRequestStatus::Failed.is_terminal());
    }
}
