//! Layer 2: cross-field rules within a single row.

use std::collections::HashMap;

use mfg_protocol::TableCode;
use mfg_schema::SchemaViolation;

use crate::coerce::CoercedValue;

/// Apply the fixed per-table-code cross-field rules to one row's
/// coerced values.
pub fn check_cross_field(table_code: TableCode, values: &HashMap<String, CoercedValue>) -> Vec<SchemaViolation> {
    match table_code {
        TableCode::P2 => check_p2(values),
        TableCode::P3 => check_p3(values),
        TableCode::P1 => Vec::new(),
    }
}

/// `appearance == NG` requires `notes` to be present.
fn check_p2(values: &HashMap<String, CoercedValue>) -> Vec<SchemaViolation> {
    let mut errors = Vec::new();
    let appearance_is_ng = matches!(values.get("appearance"), Some(CoercedValue::Text(s)) if s == "NG");
    if appearance_is_ng {
        let notes_present = matches!(values.get("notes"), Some(v) if !matches!(v, CoercedValue::Null));
        if !notes_present {
            errors.push(SchemaViolation {
                field: "notes".to_string(),
                error_code: "E_REQUIRED".to_string(),
                message: "notes is required when appearance is NG".to_string(),
                value: None,
            });
        }
    }
    errors
}

/// A `machine_no` value requires `mold_no` to be present.
fn check_p3(values: &HashMap<String, CoercedValue>) -> Vec<SchemaViolation> {
    let mut errors = Vec::new();
    let machine_no_present = matches!(values.get("machine_no"), Some(v) if !matches!(v, CoercedValue::Null));
    if machine_no_present {
        let mold_no_present = matches!(values.get("mold_no"), Some(v) if !matches!(v, CoercedValue::Null));
        if !mold_no_present {
            errors.push(SchemaViolation {
                field: "mold_no".to_string(),
                error_code: "E_REQUIRED".to_string(),
                message: "mold_no is required when machine_no is present".to_string(),
                value: None,
            });
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2_ng_appearance_without_notes_fails() {
        let mut values = HashMap::new();
        values.insert("appearance".to_string(), CoercedValue::Text("NG".to_string()));
        let errors = check_cross_field(TableCode::P2, &values);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "notes");
    }

    #[test]
    fn p2_ng_appearance_with_notes_passes() {
        let mut values = HashMap::new();
        values.insert("appearance".to_string(), CoercedValue::Text("NG".to_string()));
        values.insert("notes".to_string(), CoercedValue::Text("scuffed".to_string()));
        assert!(check_cross_field(TableCode::P2, &values).is_empty());
    }

    #[test]
    fn p3_machine_no_without_mold_no_fails() {
        let mut values = HashMap::new();
        values.insert("machine_no".to_string(), CoercedValue::Text("M1".to_string()));
        let errors = check_cross_field(TableCode::P3, &values);
        assert_eq!(errors[0].field, "mold_no");
    }
}
