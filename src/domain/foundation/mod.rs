//! Shared domain primitives.
//!
//! # Module Structure
//!
//! - `errors` - ValidationError, ErrorCode, DomainError
//! - `ids` - Strongly-typed identifiers
//! - `state_machine` - StateMachine trait for status enums
//! - `timestamp` - UTC timestamp value object

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AuditRecordId, GrantId, GroupId, RoleId, SubjectId, SyncRequestId, TierId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
