//! Entitlement domain: the grant ledger.
//!
//! # Module Structure
//!
//! - `grant` - EntitlementGrant aggregate
//! - `status` - GrantStatus state machine

mod grant;
mod status;

pub use grant::{EntitlementGrant, GrantSource, SourceRef};
pub use status::GrantStatus;
