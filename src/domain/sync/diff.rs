//! Role diff computation.
//!
//! The diff is the worker's ownership boundary: only managed roles (those
//! referenced by some tier in the group) are ever added or removed, and
//! the group's everyone-role is never removed even when a tier references
//! it by mistake.

use std::collections::BTreeSet;

use crate::domain::foundation::RoleId;

/// The role changes to apply for one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDiff {
    /// Managed roles the subject should hold but does not.
    pub add: Vec<RoleId>,
    /// Managed roles the subject holds but should not.
    pub remove: Vec<RoleId>,
}

impl RoleDiff {
    /// True when there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Computes the diff between the roles a subject currently holds and the
/// roles the entitlement ledger says they should hold.
///
/// - additions: desired roles not currently held
/// - removals: currently held roles that are managed but not desired,
///   excluding `everyone_role`
///
/// Non-managed roles never appear in either set. Output order is
/// deterministic (sorted by role id).
pub fn diff_roles(
    current: &[RoleId],
    desired: &BTreeSet<RoleId>,
    managed: &BTreeSet<RoleId>,
    everyone_role: &RoleId,
) -> RoleDiff {
    let current: BTreeSet<&RoleId> = current.iter().collect();

    let add = desired
        .iter()
        .filter(|role| !current.contains(role))
        .cloned()
        .collect();

    let remove = current
        .iter()
        .filter(|role| {
            managed.contains(**role) && !desired.contains(**role) && **role != everyone_role
        })
        .map(|role| (*role).clone())
        .collect();

    RoleDiff { add, remove }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: &str) -> RoleId {
        RoleId::new(id).unwrap()
    }

    fn set(ids: &[&str]) -> BTreeSet<RoleId> {
        ids.iter().map(|id| role(id)).collect()
    }

    #[test]
    fn adds_missing_and_removes_extra_managed_roles() {
        // current {A,B}, desired {B,C}, managed {A,B,C} => add {C}, remove {A}
        let current = vec![role("A"), role("B")];
        let diff = diff_roles(&current, &set(&["B", "C"]), &set(&["A", "B", "C"]), &role("G"));

        assert_eq!(diff.add, vec![role("C")]);
        assert_eq!(diff.remove, vec![role("A")]);
    }

    #[test]
    fn never_touches_non_managed_roles() {
        let current = vec![role("moderator"), role("A")];
        let diff = diff_roles(&current, &set(&[]), &set(&["A"]), &role("G"));

        assert_eq!(diff.add, Vec::<RoleId>::new());
        assert_eq!(diff.remove, vec![role("A")]);
    }

    #[test]
    fn never_removes_the_everyone_role() {
        // Everyone-role is managed (a tier references it) and not desired,
        // but must not be removed.
        let current = vec![role("G"), role("A")];
        let diff = diff_roles(&current, &set(&[]), &set(&["G", "A"]), &role("G"));

        assert_eq!(diff.remove, vec![role("A")]);
    }

    #[test]
    fn no_changes_when_current_matches_desired() {
        let current = vec![role("A"), role("B")];
        let diff = diff_roles(&current, &set(&["A", "B"]), &set(&["A", "B"]), &role("G"));

        assert!(diff.is_empty());
    }

    #[test]
    fn desired_roles_already_held_are_not_re_added() {
        let current = vec![role("A")];
        let diff = diff_roles(&current, &set(&["A", "B"]), &set(&["A", "B"]), &role("G"));

        assert_eq!(diff.add, vec![role("B")]);
        assert!(diff.remove.is_empty());
    }

    #[test]
    fn output_order_is_deterministic() {
        let current = vec![];
        let diff = diff_roles(&current, &set(&["C", "A", "B"]), &set(&["A", "B", "C"]), &role("G"));

        assert_eq!(diff.add, vec![role("A"), role("B"), role("C")]);
    }
}
