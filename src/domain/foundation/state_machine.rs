//! State machine trait for status enums.
//!
//! Provides a consistent interface for validating and performing state
//! transitions across entity lifecycle statuses (grants, sync requests).

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for SyncRequestStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!(
///             (self, target),
///             (Pending, InProgress) |
///             (InProgress, Completed) |
///             // ... etc
///         )
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Pending => vec![InProgress],
///             InProgress => vec![Completed, Failed],
///             // ... etc
///         }
///     }
/// }
///
/// // Usage:
/// let new_status = current.transition_to(SyncRequestStatus::Completed)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    ///
    /// This is the preferred way to change state, as it ensures
    /// the transition is valid according to the state machine rules.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal work-item lifecycle used to exercise the trait defaults.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum WorkStatus {
        Queued,
        Running,
        Done,
        Failed,
    }

    impl StateMachine for WorkStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            use WorkStatus::*;
            matches!(
                (self, target),
                (Queued, Running) | (Running, Done) | (Running, Failed)
            )
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use WorkStatus::*;
            match self {
                Queued => vec![Running],
                Running => vec![Done, Failed],
                Done => vec![],
                Failed => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        let status = WorkStatus::Queued;
        let result = status.transition_to(WorkStatus::Running);
        assert_eq!(result, Ok(WorkStatus::Running));
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        let status = WorkStatus::Queued;
        let result = status.transition_to(WorkStatus::Done);
        assert!(result.is_err());
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(WorkStatus::Done.is_terminal());
        assert!(WorkStatus::Failed.is_terminal());
        assert!(!WorkStatus::Queued.is_terminal());
        assert!(!WorkStatus::Running.is_terminal());
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for status in [
            WorkStatus::Queued,
            WorkStatus::Running,
            WorkStatus::Done,
            WorkStatus::Failed,
        ] {
            for valid_target in status.valid_transitions() {
                assert!(
                    status.can_transition_to(&valid_target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    status,
                    valid_target
                );
            }
        }
    }
}
