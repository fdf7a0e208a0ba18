//! The four-layer validation engine: column-level, cross-field,
//! cross-row (in-file), and cross-table (against-DB), run in that order
//! against each staged row.
//!
//! Layers 1-2 stop per-row at first layer with errors (column-level
//! errors are all collected before cross-field rules run against the
//! coerced values); layers 3-4 operate over the whole staged batch and
//! are applied afterward, merging their findings into each row's error
//! list.

pub mod coerce;
pub mod cross_field;
pub mod cross_row;
pub mod cross_table;

use std::collections::HashMap;

use mfg_ids::TenantId;
use mfg_protocol::TableCode;
use mfg_schema::{ColumnSpec, SchemaViolation};

pub use coerce::CoercedValue;
pub use cross_table::CrossTableSettings;

/// One staged row's raw cell values, keyed by canonical column name —
/// the shape `mfg_parser` produces.
pub type RawRow = HashMap<String, String>;

/// Outcome of validating a single row through layers 1-2.
pub struct RowValidation {
    pub values: HashMap<String, CoercedValue>,
    pub errors: Vec<SchemaViolation>,
}

/// Run column-level and cross-field validation for one row. Cross-row
/// and cross-table checks are applied separately once the whole batch
/// has gone through this pass, since they need the full set of rows or
/// a DB round trip.
pub fn validate_single_row(table_code: TableCode, columns: &[ColumnSpec], raw: &RawRow) -> RowValidation {
    let (values, mut errors) = coerce::validate_row(columns, raw);
    errors.extend(cross_field::check_cross_field(table_code, &values));
    RowValidation { values, errors }
}

/// Merge a cross-row or cross-table violation into a row's error list,
/// stored per `row_index`. The caller owns the staging-row update after
/// this; this type only accumulates the merge.
#[derive(Default)]
pub struct ErrorSink {
    pub by_row: HashMap<usize, Vec<SchemaViolation>>,
}

impl ErrorSink {
    pub fn add(&mut self, row_index: usize, violation: SchemaViolation) {
        self.by_row.entry(row_index).or_default().push(violation);
    }

    pub fn extend(&mut self, row_index: usize, violations: impl IntoIterator<Item = SchemaViolation>) {
        self.by_row.entry(row_index).or_default().extend(violations);
    }

    pub fn error_count(&self) -> usize {
        self.by_row.values().map(|v| v.len()).sum()
    }

    pub fn rows_with_errors(&self) -> usize {
        self.by_row.len()
    }
}

/// Tenant-scoped identity the cross-table layer needs to restrict its
/// DB lookups.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub tenant_id: TenantId,
    pub table_code: TableCode,
    pub cross_table: CrossTableSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfg_protocol::DataType;

    #[test]
    fn single_row_validation_runs_column_then_cross_field() {
        let columns = vec![
            ColumnSpec::required("appearance", DataType::Text),
            ColumnSpec::optional("notes", DataType::Text),
        ];
        let mut raw = RawRow::new();
        raw.insert("appearance".to_string(), "NG".to_string());
        let result = validate_single_row(TableCode::P2, &columns, &raw);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "notes");
    }

    #[test]
    fn error_sink_accumulates_per_row() {
        let mut sink = ErrorSink::default();
        sink.add(0, SchemaViolation::null_not_allowed("lot_no"));
        sink.add(0, SchemaViolation::null_not_allowed("notes"));
        sink.add(1, SchemaViolation::null_not_allowed("lot_no"));
        assert_eq!(sink.error_count(), 3);
        assert_eq!(sink.rows_with_errors(), 2);
    }
}
