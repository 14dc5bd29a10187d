//! Catalog domain: groups, tiers, and entitlement policies.
//!
//! # Module Structure
//!
//! - `group` - Managed group definition
//! - `tier` - Access tiers, policies, processor cross-references

mod group;
mod tier;

pub use group::Group;
pub use tier::{EntitlementPolicy, ProcessorRefs, Tier};
