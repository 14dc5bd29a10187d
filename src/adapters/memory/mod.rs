//! In-memory adapters.
//!
//! Complete port implementations backed by `tokio::sync::RwLock`, used by
//! unit tests, integration tests, and local development wiring. The sync
//! queue reproduces the storage adapter's claim semantics so worker tests
//! exercise the real concurrency contract.

mod audit;
mod catalog;
mod event_store;
mod grant_repository;
mod links;
mod platform;
mod sync_queue;

pub use audit::InMemoryAuditLog;
pub use catalog::InMemoryCatalogRepository;
pub use event_store::InMemoryProviderEventStore;
pub use grant_repository::InMemoryGrantRepository;
pub use links::InMemoryCustomerLinkRepository;
pub use platform::{InMemoryPlatformGateway, RoleCall};
pub use sync_queue::InMemorySyncQueue;
