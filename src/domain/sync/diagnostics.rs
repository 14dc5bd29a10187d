//! Role sync diagnostics.
//!
//! Turns otherwise-silent sync failures into an actionable report: the
//! platform refuses to grant a role at or above the bot actor's own top
//! role, and a missing manage-roles permission fails every call. Both are
//! invisible from a single failed API response.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::RoleId;

/// A role visible in the group, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRole {
    pub id: RoleId,
    pub name: String,
    /// Position in the role hierarchy; higher outranks lower.
    pub position: i64,
}

/// Standing of one managed role from the bot actor's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "standing", rename_all = "snake_case")]
pub enum RoleStanding {
    /// Grantable.
    Ok,
    /// At or above the actor's top role; grants will be rejected.
    Blocked { role_position: i64, actor_top_position: i64 },
    /// Referenced by a tier but absent from the group.
    Missing,
}

/// Per-managed-role diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDiagnostic {
    pub role_id: RoleId,
    pub standing: RoleStanding,
}

/// Diagnostics for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    /// False when the bot actor lacks the manage-roles permission.
    pub can_manage_roles: bool,
    pub roles: Vec<RoleDiagnostic>,
}

impl DiagnosticsReport {
    /// True when every managed role is grantable and permission is held.
    pub fn is_healthy(&self) -> bool {
        self.can_manage_roles
            && self
                .roles
                .iter()
                .all(|r| matches!(r.standing, RoleStanding::Ok))
    }
}

/// Evaluates each managed role against the group's role list and the
/// actor's top role position.
pub fn diagnose(
    managed_roles: &[RoleId],
    group_roles: &[GroupRole],
    actor_top_position: i64,
    can_manage_roles: bool,
) -> DiagnosticsReport {
    let roles = managed_roles
        .iter()
        .map(|role_id| {
            let standing = match group_roles.iter().find(|r| &r.id == role_id) {
                None => RoleStanding::Missing,
                Some(found) if found.position >= actor_top_position => RoleStanding::Blocked {
                    role_position: found.position,
                    actor_top_position,
                },
                Some(_) => RoleStanding::Ok,
            };
            RoleDiagnostic {
                role_id: role_id.clone(),
                standing,
            }
        })
        .collect();

    DiagnosticsReport {
        can_manage_roles,
        roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: &str) -> RoleId {
        RoleId::new(id).unwrap()
    }

    fn group_role(id: &str, position: i64) -> GroupRole {
        GroupRole {
            id: role(id),
            name: format!("role-{id}"),
            position,
        }
    }

    #[test]
    fn role_below_actor_is_ok() {
        let report = diagnose(&[role("A")], &[group_role("A", 3)], 5, true);

        assert_eq!(report.roles[0].standing, RoleStanding::Ok);
        assert!(report.is_healthy());
    }

    #[test]
    fn role_at_actor_position_is_blocked() {
        let report = diagnose(&[role("A")], &[group_role("A", 5)], 5, true);

        assert_eq!(
            report.roles[0].standing,
            RoleStanding::Blocked {
                role_position: 5,
                actor_top_position: 5
            }
        );
        assert!(!report.is_healthy());
    }

    #[test]
    fn role_above_actor_is_blocked() {
        let report = diagnose(&[role("A")], &[group_role("A", 9)], 5, true);

        assert!(matches!(
            report.roles[0].standing,
            RoleStanding::Blocked { .. }
        ));
    }

    #[test]
    fn role_absent_from_group_is_missing() {
        let report = diagnose(&[role("gone")], &[group_role("A", 1)], 5, true);

        assert_eq!(report.roles[0].standing, RoleStanding::Missing);
        assert!(!report.is_healthy());
    }

    #[test]
    fn missing_permission_is_unhealthy_even_with_ok_roles() {
        let report = diagnose(&[role("A")], &[group_role("A", 1)], 5, false);

        assert!(!report.can_manage_roles);
        assert!(!report.is_healthy());
    }

    #[test]
    fn mixed_report_covers_every_managed_role() {
        let report = diagnose(
            &[role("ok"), role("blocked"), role("gone")],
            &[group_role("ok", 1), group_role("blocked", 8)],
            5,
            true,
        );

        assert_eq!(report.roles.len(), 3);
        assert_eq!(report.roles[0].standing, RoleStanding::Ok);
        assert!(matches!(report.roles[1].standing, RoleStanding::Blocked { .. }));
        assert_eq!(report.roles[2].standing, RoleStanding::Missing);
    }
}
