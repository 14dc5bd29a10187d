//! Guildpass - payment-driven group access.
//!
//! Reconciles payment processor webhooks into an entitlement ledger and
//! keeps community platform roles converged with it: webhooks are
//! verified, normalized, and recorded idempotently; reconciliation moves
//! grants through their lifecycle; a queue-driven worker adds and removes
//! platform roles to match effective entitlements.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
