//! PlatformGateway port - the community platform's member and role API.
//!
//! Every sync-worker side effect flows through this seam, which keeps the
//! worker testable without network access and confines rate-limit handling
//! to one place.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{GroupId, RoleId, SubjectId};
use crate::domain::sync::GroupRole;

/// Errors surfaced by the platform API.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// 429 from the platform; `retry_after` is its backoff hint when sent.
    #[error("rate limited by platform{}", retry_after.map(|d| format!(" (retry after {}s)", d.as_secs())).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    /// The bot actor lacks permission for the operation.
    #[error("platform forbade the operation: {0}")]
    Forbidden(String),

    /// Group, member, or role does not exist on the platform.
    #[error("platform object not found: {0}")]
    NotFound(String),

    /// 5xx from the platform.
    #[error("platform server error (status {status})")]
    Server { status: u16 },

    /// Transport failure before a response arrived.
    #[error("platform request failed: {0}")]
    Network(String),

    /// Response arrived but could not be decoded.
    #[error("unexpected platform response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// True when retrying the same call can plausibly succeed.
    ///
    /// Permission and not-found failures are configuration problems; a
    /// retry burns the attempt budget without changing the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlatformError::RateLimited { .. }
                | PlatformError::Server { .. }
                | PlatformError::Network(_)
        )
    }

    /// The platform's explicit backoff hint, when one was sent.
    pub fn retry_after_hint(&self) -> Option<Duration> {
        match self {
            PlatformError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// A group member as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub subject_id: SubjectId,
    /// Roles currently held, in platform order.
    pub role_ids: Vec<RoleId>,
}

/// The bot actor's own standing in a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    /// Whether the actor holds the manage-roles permission.
    pub can_manage_roles: bool,
    /// Position of the actor's highest role; the platform rejects grants
    /// of roles at or above this position.
    pub top_role_position: i64,
}

/// Port for the community platform API.
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// All roles defined in the group.
    async fn group_roles(&self, group_id: &GroupId) -> Result<Vec<GroupRole>, PlatformError>;

    /// The bot actor's permission and hierarchy standing in the group.
    async fn actor_context(&self, group_id: &GroupId) -> Result<ActorContext, PlatformError>;

    /// Every member of the group.
    async fn list_members(&self, group_id: &GroupId) -> Result<Vec<Member>, PlatformError>;

    /// One member, or `None` when the subject is not in the group.
    async fn member(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
    ) -> Result<Option<Member>, PlatformError>;

    async fn add_role(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
        role_id: &RoleId,
    ) -> Result<(), PlatformError>;

    async fn remove_role(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
        role_id: &RoleId,
    ) -> Result<(), PlatformError>;
}
