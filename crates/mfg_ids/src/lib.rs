//! Shared identifier wrappers for the manufacturing traceability service.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Error returned when parsing a UUID-backed identifier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

macro_rules! define_uuid_id {
    ($name:ident, $label:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                Uuid::parse_str(value)
                    .map_err(|e| IdParseError::new(format!("Invalid {}: {}", $label, e)))?;
                Ok(Self(value.to_string()))
            }

            pub fn as_str(&self) -> &str {
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

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_uuid_id!(TenantId, "tenant ID");
define_uuid_id!(ApiKeyId, "API key ID");
define_uuid_id!(SchemaVersionId, "schema version ID");
define_uuid_id!(JobId, "import job ID");
define_uuid_id!(ImportFileId, "import file ID");
define_uuid_id!(StagingRowId, "staging row ID");
define_uuid_id!(P1Id, "P1 record ID");
define_uuid_id!(P2Id, "P2 record ID");
define_uuid_id!(P2ItemId, "P2 item ID");
define_uuid_id!(P3Id, "P3 record ID");
define_uuid_id!(P3ItemId, "P3 item ID");
define_uuid_id!(RowEditId, "row edit ID");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_roundtrip_through_string() {
        let id = TenantId::new();
        let parsed = TenantId::parse(id.as_str()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_non_uuid_strings() {
        assert!(JobId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn distinct_id_types_do_not_mix() {
        let tenant = TenantId::new();
        let job = JobId::parse(tenant.as_str()).unwrap();
        assert_eq!(tenant.as_str(), job.as_str());
    }
}
