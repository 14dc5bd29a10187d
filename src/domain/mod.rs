//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, timestamps, errors)
//! - `catalog` - Groups, tiers, entitlement policies
//! - `entitlement` - Grant ledger and status state machine
//! - `provider` - Canonical payment events and webhook errors
//! - `sync` - Role reconciliation work items, diffing, retry, diagnostics

pub mod catalog;
pub mod entitlement;
pub mod foundation;
pub mod provider;
pub mod sync;
