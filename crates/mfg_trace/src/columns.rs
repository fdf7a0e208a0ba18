//! The default flattener output column map.
//!
//! A tenant may replace this with its own list via
//! `tenant_flatten_columns`; the default below is what a freshly
//! created tenant starts with. Columns not backed by a structured
//! field fall through to whatever key of that name exists in the
//! matching row's JSON detail blob (`row_data`/`extras`), so a tenant
//! can point a column at a field their own export happens to use
//! without a code change.

use serde_json::Value;

use crate::error::{Result, TraceError};

pub const DEFAULT_COLUMNS: &[&str] = &[
    // P3 core identity
    "p3_item_id",
    "p3_record_id",
    "row_no",
    "product_id",
    "lot_no",
    "production_date",
    "machine_no",
    "mold_no",
    "production_lot",
    "source_winder",
    "specification",
    "bottom_tape_lot",
    "adjustment_record",
    // P1 join fields
    "p1_id",
    "p1_lot_no_raw",
    "p1_lot_no_norm",
    "p1_production_date",
    "p1_schema_version_id",
    // P2 join fields
    "p2_id",
    "p2_lot_no_raw",
    "p2_lot_no_norm",
    "p2_production_date",
    "p2_item_id",
    "p2_winder_number",
    "p2_sheet_width",
    "p2_appearance",
    "p2_rough_edge",
    "p2_slitting_result",
    // Remaining P3 detail slots, resolved against row_data by name.
    "detail_01",
    "detail_02",
    "detail_03",
    "detail_04",
    "detail_05",
    "detail_06",
    "detail_07",
    "detail_08",
    "detail_09",
    "detail_10",
    "detail_11",
    "detail_12",
    "detail_13",
    "detail_14",
    "detail_15",
    "detail_16",
    "detail_17",
    "detail_18",
    "detail_19",
    "detail_20",
    "detail_21",
    "detail_22",
    "detail_23",
    "detail_24",
    "detail_25",
    "detail_26",
    "detail_27",
    "detail_28",
    "detail_29",
    "detail_30",
    "detail_31",
    "detail_32",
    "detail_33",
    "detail_34",
    "detail_35",
    "detail_36",
];

/// An ordered list of output column names. The identity of a map is
/// `(tenant_id, map_version)`; callers that already hold a resolved map
/// for a version need not re-fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenerColumnMap {
    columns: Vec<String>,
}

impl FlattenerColumnMap {
    pub fn default_map() -> Self {
        Self {
            columns: DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parse a `tenant_flatten_columns.columns_json` value: a JSON
    /// array of column name strings.
    pub fn from_json(value: Value) -> Result<Self> {
        let columns = value
            .as_array()
            .ok_or_else(|| TraceError::Db(mfg_db::DbError::Constraint(
                "tenant_flatten_columns.columns_json must be a JSON array".to_string(),
            )))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| TraceError::Db(mfg_db::DbError::Constraint(
                        "tenant_flatten_columns.columns_json entries must be strings".to_string(),
                    )))
            })
            .collect::<Result<Vec<String>>>()?;
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_has_sixty_four_columns() {
        assert_eq!(FlattenerColumnMap::default_map().columns().len(), 64);
    }

    #[test]
    fn parses_from_json_array() {
        let value = serde_json::json!(["lot_no", "product_id"]);
        let map = FlattenerColumnMap::from_json(value).unwrap();
        assert_eq!(map.columns(), &["lot_no".to_string(), "product_id".to_string()]);
    }

    #[test]
    fn rejects_non_array_json() {
        let value = serde_json::json!({"not": "an array"});
        assert!(FlattenerColumnMap::from_json(value).is_err());
    }
}
