//! Webhook ingestion surface.
//!
//! # Module Structure
//!
//! - `routes` - Per-processor POST routes
//! - `handlers` - Verification, ingestion, and the status contract
//! - `dto` - Error body

mod dto;
mod handlers;
mod routes;

pub use handlers::WebhookAppState;
pub use routes::webhook_routes;
