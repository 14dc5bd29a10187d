//! Entitlement grant status state machine.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Lifecycle status of an entitlement grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// Awaiting first payment confirmation. No access.
    Pending,

    /// Paid and current. Access granted while the window holds.
    Active,

    /// Payment failed; grace period while the processor retries.
    /// Access retained.
    PastDue,

    /// Revoked by cancellation or refund. No access. Terminal.
    Canceled,

    /// Validity window lapsed. No access. Terminal; a new purchase
    /// creates a new grant.
    Expired,

    /// Chargeback opened against the payment. Access withheld until the
    /// dispute resolves.
    SuspendedDispute,
}

impl GrantStatus {
    /// True if this status counts toward effective entitlement.
    ///
    /// Effectiveness also requires the validity window to hold; see
    /// `EntitlementGrant::is_effective`.
    pub fn grants_access(&self) -> bool {
        matches!(self, GrantStatus::Active | GrantStatus::PastDue)
    }
}

impl StateMachine for GrantStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use GrantStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Active)
                | (Pending, Expired)
            // From ACTIVE
                | (Active, Active) // renewal extends the window
                | (Active, PastDue)
                | (Active, Canceled)
                | (Active, Expired)
                | (Active, SuspendedDispute)
            // From PAST_DUE
                | (PastDue, Active)
                | (PastDue, Canceled)
                | (PastDue, Expired)
                | (PastDue, SuspendedDispute)
            // From SUSPENDED_DISPUTE
                | (SuspendedDispute, Active)
                | (SuspendedDispute, Canceled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use GrantStatus::*;
        match self {
            Pending => vec![Active, Expired],
            Active => vec![Active, PastDue, Canceled, Expired, SuspendedDispute],
            PastDue => vec![Active, Canceled, Expired, SuspendedDispute],
            SuspendedDispute => vec![Active, Canceled],
            Canceled => vec![],
            Expired => vec![],
        }
    }
}
