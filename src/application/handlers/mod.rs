//! Command handlers and queries.
//!
//! # Module Structure
//!
//! - `ingest_webhook` - Record-then-reconcile surface for webhook routes
//! - `apply_provider_event` - Canonical event to ledger reconciliation
//! - `create_grant` / `revoke_grant` - Operator ledger mutations
//! - `request_sync` - Sync queue enqueue surface
//! - `desired_roles` - Derived role-set queries
//! - `expire_sweep` - Validity-window expiry
//! - `link_customer` - Processor customer to subject links

mod apply_provider_event;
mod create_grant;
mod desired_roles;
mod expire_sweep;
mod ingest_webhook;
mod link_customer;
mod request_sync;
mod revoke_grant;

pub use apply_provider_event::{ApplyOutcome, ApplyProviderEventHandler};
pub use create_grant::{CreateGrantCommand, CreateGrantHandler};
pub use desired_roles::DesiredRolesQuery;
pub use expire_sweep::ExpireSweepHandler;
pub use ingest_webhook::{IngestOutcome, IngestProviderEventHandler};
pub use link_customer::{LinkCustomerCommand, LinkCustomerHandler};
pub use request_sync::{RequestRoleSyncCommand, RequestRoleSyncHandler};
pub use revoke_grant::{RevokeGrantCommand, RevokeGrantHandler, RevokeOutcome};
