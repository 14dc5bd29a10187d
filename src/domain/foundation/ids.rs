//! Strongly-typed identifier value objects.
//!
//! Platform-assigned identifiers (groups, subjects, roles, processor
//! customers) are opaque strings; internally generated identifiers
//! (tiers, grants, sync requests) are UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

macro_rules! platform_id {
    ($(#[$doc:meta])* $name:ident, $field:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier, rejecting empty values.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(value))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for an access tier.
    TierId
}

uuid_id! {
    /// Unique identifier for an entitlement grant.
    GrantId
}

uuid_id! {
    /// Unique identifier for a role sync request.
    SyncRequestId
}

uuid_id! {
    /// Unique identifier for an audit record.
    AuditRecordId
}

platform_id! {
    /// Platform-assigned identifier for a managed group.
    GroupId, "group_id"
}

platform_id! {
    /// Platform-assigned identifier for a subject (member).
    SubjectId, "subject_id"
}

platform_id! {
    /// Platform-assigned identifier for a role within a group.
    RoleId, "role_id"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(GrantId::new(), GrantId::new());
        assert_ne!(TierId::new(), TierId::new());
    }

    #[test]
    fn uuid_id_round_trips_through_string() {
        let id = SyncRequestId::new();
        let parsed: SyncRequestId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn platform_id_accepts_snowflakes() {
        let id = GroupId::new("812345678901234567").unwrap();
        assert_eq!(id.as_str(), "812345678901234567");
    }

    #[test]
    fn platform_id_rejects_empty() {
        assert!(GroupId::new("").is_err());
        assert!(SubjectId::new("   ").is_err());
        assert!(RoleId::new("").is_err());
    }

    #[test]
    fn platform_id_serializes_transparently() {
        let id = RoleId::new("900000000000000001").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"900000000000000001\"");
    }
}
