//! In-memory PlatformGateway for tests and local development.
//!
//! Holds a mutable picture of one or more groups and records every role
//! mutation. Failures can be injected per role id to exercise the worker's
//! retry and diagnostics paths.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{GroupId, RoleId, SubjectId};
use crate::domain::sync::GroupRole;
use crate::ports::{ActorContext, Member, PlatformError, PlatformGateway};

/// A recorded role mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCall {
    Add { subject_id: SubjectId, role_id: RoleId },
    Remove { subject_id: SubjectId, role_id: RoleId },
}

#[derive(Default)]
struct GroupState {
    roles: Vec<GroupRole>,
    members: Vec<Member>,
    actor: Option<ActorContext>,
}

#[derive(Default)]
struct Inner {
    groups: HashMap<String, GroupState>,
    calls: Vec<RoleCall>,
    /// Roles whose mutation fails, with the error to return and how many
    /// times to fail before succeeding (`None` = always).
    failing_roles: HashMap<String, (u32, Option<u32>)>,
}

/// Configurable in-memory platform.
#[derive(Default)]
pub struct InMemoryPlatformGateway {
    inner: RwLock<Inner>,
}

impl InMemoryPlatformGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_roles(&self, group_id: &GroupId, roles: Vec<GroupRole>) {
        self.inner
            .write()
            .await
            .groups
            .entry(group_id.as_str().to_string())
            .or_default()
            .roles = roles;
    }

    pub async fn set_actor(&self, group_id: &GroupId, actor: ActorContext) {
        self.inner
            .write()
            .await
            .groups
            .entry(group_id.as_str().to_string())
            .or_default()
            .actor = Some(actor);
    }

    pub async fn add_member(&self, group_id: &GroupId, member: Member) {
        self.inner
            .write()
            .await
            .groups
            .entry(group_id.as_str().to_string())
            .or_default()
            .members
            .push(member);
    }

    /// Makes mutations of `role_id` fail with a 502 `fail_count` times,
    /// then succeed; `None` fails forever.
    pub async fn inject_role_failure(&self, role_id: &RoleId, fail_count: Option<u32>) {
        self.inner
            .write()
            .await
            .failing_roles
            .insert(role_id.as_str().to_string(), (0, fail_count));
    }

    pub async fn calls(&self) -> Vec<RoleCall> {
        self.inner.read().await.calls.clone()
    }

    async fn check_injected_failure(&self, role_id: &RoleId) -> Result<(), PlatformError> {
        let mut inner = self.inner.write().await;
        if let Some((seen, budget)) = inner.failing_roles.get_mut(role_id.as_str()) {
            match budget {
                Some(max) if *seen >= *max => {}
                _ => {
                    *seen += 1;
                    return Err(PlatformError::Server { status: 502 });
                }
            }
        }
        Ok(())
    }

    async fn mutate(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
        role_id: &RoleId,
        add: bool,
    ) -> Result<(), PlatformError> {
        self.check_injected_failure(role_id).await?;

        let mut inner = self.inner.write().await;
        let call = if add {
            RoleCall::Add {
                subject_id: subject_id.clone(),
                role_id: role_id.clone(),
            }
        } else {
            RoleCall::Remove {
                subject_id: subject_id.clone(),
                role_id: role_id.clone(),
            }
        };
        inner.calls.push(call);

        let group = inner
            .groups
            .get_mut(group_id.as_str())
            .ok_or_else(|| PlatformError::NotFound(format!("group {group_id:?}")))?;
        let member = group
            .members
            .iter_mut()
            .find(|m| &m.subject_id == subject_id)
            .ok_or_else(|| PlatformError::NotFound(format!("member {subject_id:?}")))?;

        if add {
            if !member.role_ids.contains(role_id) {
                member.role_ids.push(role_id.clone());
            }
        } else {
            member.role_ids.retain(|r| r != role_id);
        }
        Ok(())
    }
}

#[async_trait]
impl PlatformGateway for InMemoryPlatformGateway {
    async fn group_roles(&self, group_id: &GroupId) -> Result<Vec<GroupRole>, PlatformError> {
        let inner = self.inner.read().await;
        inner
            .groups
            .get(group_id.as_str())
            .map(|g| g.roles.clone())
            .ok_or_else(|| PlatformError::NotFound(format!("group {group_id:?}")))
    }

    async fn actor_context(&self, group_id: &GroupId) -> Result<ActorContext, PlatformError> {
        let inner = self.inner.read().await;
        inner
            .groups
            .get(group_id.as_str())
            .and_then(|g| g.actor.clone())
            .ok_or_else(|| PlatformError::NotFound(format!("actor in group {group_id:?}")))
    }

    async fn list_members(&self, group_id: &GroupId) -> Result<Vec<Member>, PlatformError> {
        let inner = self.inner.read().await;
        inner
            .groups
            .get(group_id.as_str())
            .map(|g| g.members.clone())
            .ok_or_else(|| PlatformError::NotFound(format!("group {group_id:?}")))
    }

    async fn member(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
    ) -> Result<Option<Member>, PlatformError> {
        let inner = self.inner.read().await;
        let group = inner
            .groups
            .get(group_id.as_str())
            .ok_or_else(|| PlatformError::NotFound(format!("group {group_id:?}")))?;
        Ok(group
            .members
            .iter()
            .find(|m| &m.subject_id == subject_id)
            .cloned())
    }

    async fn add_role(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
        role_id: &RoleId,
    ) -> Result<(), PlatformError> {
        self.mutate(group_id, subject_id, role_id, true).await
    }

    async fn remove_role(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
        role_id: &RoleId,
    ) -> Result<(), PlatformError> {
        self.mutate(group_id, subject_id, role_id, false).await
    }
}
