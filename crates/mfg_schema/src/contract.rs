//! Schema version types.
//!
//! A `SchemaVersion` is immutable once created: registering a new header
//! for an existing `(tenant, table_code)` inserts a fresh version rather
//! than mutating the old one. That immutability is what lets the
//! process-local cache in [`crate::registry`] skip invalidation
//! entirely — once a fingerprint resolves to a version, it always will.

use chrono::{DateTime, Utc};
use mfg_ids::{SchemaVersionId, TenantId};
use mfg_protocol::{DataType, TableCode};
use serde::{Deserialize, Serialize};

/// One column's validation contract within a schema version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub regex: Option<String>,
    pub range: Option<(f64, f64)>,
    pub enum_values: Option<Vec<String>>,
    pub description: Option<String>,
}

impl ColumnSpec {
    pub fn required(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            regex: None,
            range: None,
            enum_values: None,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            nullable: true,
            ..Self::required(name, data_type)
        }
    }

    pub fn with_regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn with_enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

/// A registered, immutable schema version for one `(tenant, table_code)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub id: SchemaVersionId,
    pub tenant_id: TenantId,
    pub table_code: TableCode,
    pub schema_hash: String,
    pub header_fingerprint: String,
    pub columns: Vec<ColumnSpec>,
    pub created_at: DateTime<Utc>,
}

impl SchemaVersion {
    /// Look up a column spec by its canonical name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Validate that the given header row (already trimmed and
    /// whitespace-canonicalized) exactly matches this version's ordered
    /// column names.
    pub fn matches_header(&self, header: &[&str]) -> bool {
        header.len() == self.columns.len()
            && header
                .iter()
                .zip(self.columns.iter())
                .all(|(cell, col)| *cell == col.name)
    }
}

/// A single validation failure surfaced by the column-level or
/// cross-field layers of the validation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaViolation {
    pub field: String,
    pub error_code: String,
    pub message: String,
    pub value: Option<String>,
}

impl SchemaViolation {
    pub fn type_mismatch(field: impl Into<String>, expected: DataType, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            field: field.into(),
            error_code: "E_TYPE".to_string(),
            message: format!("expected {expected}, got {value:?}"),
            value: Some(value),
        }
    }

    pub fn null_not_allowed(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("{field} is required"),
            field,
            error_code: "E_REQUIRED".to_string(),
            value: None,
        }
    }

    pub fn format_mismatch(
        field: impl Into<String>,
        error_code: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let value = value.into();
        let error_code = error_code.into();
        Self {
            message: format!("{field} does not match the expected {error_code} format: {value:?}"),
            field,
            error_code,
            value: Some(value),
        }
    }
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.field, self.error_code, self.message)
    }
}

impl std::error::Error for SchemaViolation {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_version() -> SchemaVersion {
        SchemaVersion {
            id: SchemaVersionId::new(),
            tenant_id: TenantId::new(),
            table_code: TableCode::P1,
            schema_hash: "deadbeef".to_string(),
            header_fingerprint: "cafef00d".to_string(),
            columns: vec![
                ColumnSpec::required("lot_no", DataType::Text),
                ColumnSpec::optional("notes", DataType::Text),
            ],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn matches_header_requires_exact_order_and_names() {
        let v = sample_version();
        assert!(v.matches_header(&["lot_no", "notes"]));
        assert!(!v.matches_header(&["notes", "lot_no"]));
        assert!(!v.matches_header(&["lot_no"]));
    }

    #[test]
    fn column_lookup_finds_by_name() {
        let v = sample_version();
        assert_eq!(v.column("lot_no").unwrap().nullable, false);
        assert!(v.column("missing").is_none());
    }

    #[test]
    fn violation_constructors_set_expected_codes() {
        assert_eq!(SchemaViolation::null_not_allowed("lot_no").error_code, "E_REQUIRED");
        assert_eq!(
            SchemaViolation::type_mismatch("qty", DataType::Int, "abc").error_code,
            "E_TYPE"
        );
    }
}
