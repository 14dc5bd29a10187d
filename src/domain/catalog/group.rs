//! Managed group definition.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GroupId, RoleId};

/// A community group whose roles are managed by the entitlement ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Platform-assigned group id.
    pub id: GroupId,

    /// Display name shown in operator tooling.
    pub name: String,
}

impl Group {
    /// Creates a group.
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The group's default role held by every member.
    ///
    /// On the platform the everyone-role id equals the group id. The sync
    /// worker must never remove it, even if a tier references it.
    pub fn everyone_role(&self) -> RoleId {
        RoleId::new(self.id.as_str()).expect("group id is non-empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everyone_role_matches_group_id() {
        let group = Group::new(GroupId::new("812345678901234567").unwrap(), "Rust Guild");
        assert_eq!(group.everyone_role().as_str(), "812345678901234567");
    }
}
