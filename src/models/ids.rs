//! Strongly-typed ID wrappers for all entity types
//!
//! Using newtype wrappers prevents accidentally mixing up IDs from different
//! entity types at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Macro to generate ID newtype wrappers
macro_rules! define_id {
    ($name:ident, $display_prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse an ID from a string
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                s.parse()
            }

            /// True when `s` is the short display form of this ID
            pub fn matches_short(&self, s: &str) -> bool {
                let s = s.strip_prefix($display_prefix).unwrap_or(s);
                s.len() >= 8 && self.0.to_string().starts_with(s)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, &self.0.to_string()[..8])
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.strip_prefix($display_prefix).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(UserId, "usr-");
define_id!(OrganizationId, "org-");
define_id!(FirmId, "firm-");
define_id!(RelationId, "rel-");
define_id!(BoxId, "box-");
define_id!(DocumentId, "doc-");
define_id!(SubDocumentId, "sub-");
define_id!(PaymentId, "pay-");
define_id!(CategoryId, "cat-");
define_id!(ContactId, "con-");
define_id!(CostCenterId, "cc-");
define_id!(TaskId, "task-");
define_id!(ExportProfileId, "exp-");
define_id!(ExportHistoryId, "hist-");
define_id!(IntegrationId, "int-");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        let id = BoxId::new();
        let display = format!("{}", id);
        assert!(display.starts_with("box-"));
        assert_eq!(display.len(), 12); // "box-" + 8 chars
    }

    #[test]
    fn test_id_equality() {
        let id1 = OrganizationId::new();
        let id2 = id1;
        assert_eq!(id1, id2);
        assert_ne!(id1, OrganizationId::new());
    }

    #[test]
    fn test_id_serialization() {
        let id = PaymentId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: PaymentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_id_parse_with_and_without_prefix() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id = BoxId::parse(uuid_str).unwrap();
        assert_eq!(id.as_uuid().to_string(), uuid_str);

        let prefixed: BoxId = format!("box-{}", uuid_str).parse().unwrap();
        assert_eq!(prefixed, id);
    }

    #[test]
    fn test_matches_short() {
        let id = TaskId::new();
        let short = id.to_string();
        assert!(id.matches_short(&short));
        assert!(id.matches_short(&short["task-".len()..]));
        assert!(!id.matches_short("task-"));
        assert!(!TaskId::new().matches_short(&short));
    }
}
