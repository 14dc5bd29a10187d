//! RoleSyncWorker - drains the sync queue and reconciles platform roles.
//!
//! Each tick claims at most one request per group (the queue's atomic
//! claim enforces single-flight per group), snapshots the group's tier
//! configuration, and converges every targeted member's roles onto the
//! ledger-derived desired set. Managed roles and tiers are read once at
//! claim time; a concurrent tier edit takes effect on the next request.
//!
//! Failure policy per platform call: retryable failures (rate limits,
//! 5xx, network) back off and retry within the attempt budget; terminal
//! failures (permissions, hierarchy, not-found) are audited and never
//! retried. One failing subject never blocks the rest of the request.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::catalog::Group;
use crate::domain::foundation::{DomainError, RoleId, SubjectId, Timestamp};
use crate::domain::sync::{
    diagnose, diff_roles, RetryPolicy, RoleStanding, RoleSyncRequest, SyncScope,
};
use crate::ports::{
    AuditAction, AuditLog, AuditRecord, CatalogRepository, Member, PlatformError, PlatformGateway,
    SyncQueue,
};

use crate::application::handlers::DesiredRolesQuery;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct RoleSyncWorkerConfig {
    /// How often to look for claimable work.
    pub tick_interval: Duration,

    /// Pause between member mutations, spreading load on the platform API.
    pub subject_delay: Duration,

    pub retry: RetryPolicy,
}

impl Default for RoleSyncWorkerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            subject_delay: Duration::from_millis(250),
            retry: RetryPolicy::default(),
        }
    }
}

/// Background role reconciliation worker.
pub struct RoleSyncWorker {
    queue: Arc<dyn SyncQueue>,
    catalog: Arc<dyn CatalogRepository>,
    platform: Arc<dyn PlatformGateway>,
    audit: Arc<dyn AuditLog>,
    desired: DesiredRolesQuery,
    config: RoleSyncWorkerConfig,
}

impl RoleSyncWorker {
    pub fn new(
        queue: Arc<dyn SyncQueue>,
        catalog: Arc<dyn CatalogRepository>,
        platform: Arc<dyn PlatformGateway>,
        audit: Arc<dyn AuditLog>,
        desired: DesiredRolesQuery,
        config: RoleSyncWorkerConfig,
    ) -> Self {
        Self {
            queue,
            catalog,
            platform,
            audit,
            desired,
            config,
        }
    }

    /// Runs the worker loop until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), DomainError> {
        let mut interval = time::interval(self.config.tick_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return Ok(());
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = self.process_tick().await {
                        tracing::error!(error = %e, "sync tick failed");
                    }
                }
            }
        }
    }

    /// One tick: claim and process at most one request per group.
    pub async fn process_tick(&self) -> Result<u32, DomainError> {
        let groups = self.queue.groups_with_pending().await?;
        let mut processed = 0u32;

        for group_id in groups {
            let Some(request) = self.queue.claim_next(&group_id).await? else {
                // Another worker holds this group, or it drained meanwhile.
                continue;
            };

            match self.process_request(&request).await {
                Ok(()) => {
                    self.queue.complete(&request.id).await?;
                    self.write_audit(AuditAction::SyncCompleted, &request, serde_json::Value::Null)
                        .await;
                }
                Err(reason) => {
                    tracing::warn!(
                        request_id = %request.id,
                        group_id = %group_id,
                        reason = %reason,
                        "sync request failed"
                    );
                    self.queue.fail(&request.id, &reason).await?;
                    self.write_audit(
                        AuditAction::SyncFailed,
                        &request,
                        serde_json::json!({"reason": reason}),
                    )
                    .await;
                }
            }
            processed += 1;
        }
        Ok(processed)
    }

    /// Processes one claimed request. `Err` carries the operator-facing
    /// failure reason.
    async fn process_request(&self, request: &RoleSyncRequest) -> Result<(), String> {
        let group = self
            .catalog
            .find_group(&request.group_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("group {} not configured", request.group_id))?;

        // Snapshot of the tier configuration this request runs against.
        let managed = self
            .desired
            .managed_roles(&group.id)
            .await
            .map_err(|e| e.to_string())?;

        let actor = self
            .with_retry(|| self.platform.actor_context(&group.id))
            .await
            .map_err(|e| format!("actor lookup: {e}"))?;
        let group_roles = self
            .with_retry(|| self.platform.group_roles(&group.id))
            .await
            .map_err(|e| format!("role list: {e}"))?;

        let managed_vec: Vec<RoleId> = managed.iter().cloned().collect();
        let report = diagnose(
            &managed_vec,
            &group_roles,
            actor.top_role_position,
            actor.can_manage_roles,
        );
        if !report.is_healthy() {
            tracing::warn!(group_id = %group.id, report = ?report, "role diagnostics unhealthy");
        }
        if !report.can_manage_roles {
            self.write_audit(
                AuditAction::SyncFailed,
                request,
                serde_json::json!({"diagnostics": report}),
            )
            .await;
            return Err("bot actor lacks the manage-roles permission".to_string());
        }

        // Blocked and missing roles are skipped rather than attempted; the
        // grantable remainder still converges.
        let grantable: BTreeSet<RoleId> = report
            .roles
            .iter()
            .filter(|d| matches!(d.standing, RoleStanding::Ok))
            .map(|d| d.role_id.clone())
            .collect();

        let members = self.targeted_members(&group, request).await?;
        let mut failures: Vec<String> = Vec::new();

        for (i, member) in members.iter().enumerate() {
            if i > 0 {
                time::sleep(self.config.subject_delay).await;
            }
            if let Err(reason) = self
                .converge_member(&group, member, &grantable, &managed)
                .await
            {
                failures.push(reason);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("; "))
        }
    }

    async fn targeted_members(
        &self,
        group: &Group,
        request: &RoleSyncRequest,
    ) -> Result<Vec<Member>, String> {
        match &request.scope {
            SyncScope::Group => self
                .with_retry(|| self.platform.list_members(&group.id))
                .await
                .map_err(|e| format!("member list: {e}")),
            SyncScope::Subject { subject_id } => {
                let member = self
                    .with_retry(|| self.platform.member(&group.id, subject_id))
                    .await
                    .map_err(|e| format!("member lookup: {e}"))?;
                // A subject who left the group has nothing to converge.
                Ok(member.into_iter().collect())
            }
        }
    }

    /// Converges one member's roles onto the desired set.
    async fn converge_member(
        &self,
        group: &Group,
        member: &Member,
        grantable: &BTreeSet<RoleId>,
        managed: &BTreeSet<RoleId>,
    ) -> Result<(), String> {
        let desired = self
            .desired
            .desired_roles(&group.id, &member.subject_id, Timestamp::now())
            .await
            .map_err(|e| e.to_string())?;

        let everyone = group.everyone_role();
        let diff = diff_roles(&member.role_ids, &desired, managed, &everyone);

        let mut failures: Vec<String> = Vec::new();

        for role_id in &diff.add {
            if !grantable.contains(role_id) {
                // Already surfaced in the diagnostics report.
                continue;
            }
            match self
                .with_retry(|| self.platform.add_role(&group.id, &member.subject_id, role_id))
                .await
            {
                Ok(()) => {
                    self.write_role_audit(AuditAction::RoleAdded, group, &member.subject_id, role_id)
                        .await;
                }
                Err(e) => failures.push(format!(
                    "add {} to {}: {e}",
                    role_id.as_str(),
                    member.subject_id.as_str()
                )),
            }
        }

        for role_id in &diff.remove {
            match self
                .with_retry(|| self.platform.remove_role(&group.id, &member.subject_id, role_id))
                .await
            {
                Ok(()) => {
                    self.write_role_audit(
                        AuditAction::RoleRemoved,
                        group,
                        &member.subject_id,
                        role_id,
                    )
                    .await;
                }
                Err(e) => failures.push(format!(
                    "remove {} from {}: {e}",
                    role_id.as_str(),
                    member.subject_id.as_str()
                )),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("; "))
        }
    }

    /// Retries retryable platform failures with backoff, honoring explicit
    /// retry-after hints. Terminal failures return immediately.
    async fn with_retry<T, F, Fut>(&self, mut call: F) -> Result<T, PlatformError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PlatformError>>,
    {
        let mut attempt = 0u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && self.config.retry.allows_retry(attempt) => {
                    let delay = self.config.retry.delay_for(attempt, e.retry_after_hint());
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying platform call");
                    time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn write_audit(
        &self,
        action: AuditAction,
        request: &RoleSyncRequest,
        details: serde_json::Value,
    ) {
        let subject_id = match &request.scope {
            SyncScope::Subject { subject_id } => Some(subject_id.clone()),
            SyncScope::Group => None,
        };
        let record = AuditRecord::new(action, Some(request.group_id.clone()), subject_id, details)
            .correlated_to(request.id.to_string());
        if let Err(e) = self.audit.append(record).await {
            tracing::warn!(error = %e, "audit append failed");
        }
    }

    async fn write_role_audit(
        &self,
        action: AuditAction,
        group: &Group,
        subject_id: &SubjectId,
        role_id: &RoleId,
    ) {
        let record = AuditRecord::new(
            action,
            Some(group.id.clone()),
            Some(subject_id.clone()),
            serde_json::json!({"role_id": role_id.as_str()}),
        );
        if let Err(e) = self.audit.append(record).await {
            tracing::warn!(error = %e, "audit append failed");
        }
    }
}
