//! Adapters - implementations of port interfaces.
//!
//! - `providers` - Per-processor webhook normalizers
//! - `http` - Inbound webhook routes
//! - `platform` - Reqwest-backed community platform gateway
//! - `postgres` - PostgreSQL storage adapters
//! - `memory` - In-memory adapters for tests and local development

pub mod http;
pub mod memory;
pub mod platform;
pub mod postgres;
pub mod providers;
