//! Sync domain: role reconciliation work items and pure sync logic.
//!
//! # Module Structure
//!
//! - `request` - RoleSyncRequest work item and its state machine
//! - `diff` - Managed-role diff computation
//! - `retry` - Bounded exponential backoff policy
//! - `diagnostics` - Per-group role health report

mod diagnostics;
mod diff;
mod request;
mod retry;

pub use diagnostics::{diagnose, DiagnosticsReport, GroupRole, RoleDiagnostic, RoleStanding};
pub use diff::{diff_roles, RoleDiff};
pub use request::{RoleSyncRequest, SyncOrigin, SyncRequestStatus, SyncScope};
pub use retry::RetryPolicy;
