//! Ports: async trait seams between the application core and the outside
//! world. Adapters implement them; handlers and workers depend only on the
//! traits.
//!
//! # Module Structure
//!
//! - `provider_event_store` - Idempotent payment event ledger
//! - `grant_repository` - Entitlement grant persistence
//! - `sync_queue` - Role sync work queue with atomic claims
//! - `platform_gateway` - Community platform member/role API
//! - `customer_link_repository` - Processor customer to subject links
//! - `catalog_repository` - Groups and tiers
//! - `audit_log` - Append-only activity trail

mod audit_log;
mod catalog_repository;
mod customer_link_repository;
mod grant_repository;
mod platform_gateway;
mod provider_event_store;
mod sync_queue;

pub use audit_log::{AuditAction, AuditActor, AuditLog, AuditRecord};
pub use catalog_repository::CatalogRepository;
pub use customer_link_repository::{CustomerLink, CustomerLinkRepository};
pub use grant_repository::GrantRepository;
pub use platform_gateway::{ActorContext, Member, PlatformError, PlatformGateway};
pub use provider_event_store::{
    EventCorrelation, ProcessingStatus, ProviderEventRecord, ProviderEventStore, RecordOutcome,
};
pub use sync_queue::SyncQueue;
