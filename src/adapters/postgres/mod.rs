//! PostgreSQL adapters - persistent implementations of the storage ports.
//!
//! - `PostgresProviderEventStore` - idempotent provider event ledger
//! - `PostgresGrantRepository` - entitlement grants
//! - `PostgresCatalogRepository` - groups and tiers
//! - `PostgresCustomerLinkRepository` - processor customer links
//! - `PostgresSyncQueue` - durable role sync queue
//! - `PostgresAuditLog` - append-only audit trail

mod audit;
mod catalog;
mod event_store;
mod grant_repository;
mod links;
mod sync_queue;

pub use audit::PostgresAuditLog;
pub use catalog::PostgresCatalogRepository;
pub use event_store::PostgresProviderEventStore;
pub use grant_repository::PostgresGrantRepository;
pub use links::PostgresCustomerLinkRepository;
pub use sync_queue::PostgresSyncQueue;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Wraps a sqlx error with the operation that hit it.
pub(crate) fn database_error(operation: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{operation}: {e}"))
}
