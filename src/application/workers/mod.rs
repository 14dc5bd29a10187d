//! Background workers.
//!
//! # Module Structure
//!
//! - `role_sync_worker` - Queue-driven platform role reconciliation
//! - `expiry_sweeper` - Periodic validity-window expiry

mod expiry_sweeper;
mod role_sync_worker;

pub use expiry_sweeper::{ExpirySweeper, ExpirySweeperConfig};
pub use role_sync_worker::{RoleSyncWorker, RoleSyncWorkerConfig};
