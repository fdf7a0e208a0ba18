//! Layer 1: column-level required/type/range/regex/enum checks.
//!
//! Coercion consults the factory shorthand maps (`Y`/`N` for bool,
//! `OK`/`NG` for int) before falling back to a generic parse, so a
//! column typed `Bool` or `Int` accepts either form.

use std::collections::HashMap;

use chrono::NaiveDate;
use regex::Regex;

use mfg_normalize::parse_date_value;
use mfg_schema::{ColumnSpec, SchemaViolation};
use mfg_protocol::DataType;

/// One column's value after successful coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    Null,
}

impl CoercedValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CoercedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CoercedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CoercedValue::Float(f) => Some(*f),
            CoercedValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CoercedValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CoercedValue::Null)
    }
}

/// Coerce and validate every column of one parsed row against its
/// schema version. Collects every column-level violation rather than
/// stopping at the first — the caller gets the full picture per row.
pub fn validate_row(
    columns: &[ColumnSpec],
    parsed: &HashMap<String, String>,
) -> (HashMap<String, CoercedValue>, Vec<SchemaViolation>) {
    let mut values = HashMap::with_capacity(columns.len());
    let mut errors = Vec::new();

    for col in columns {
        let raw = parsed.get(&col.name).map(|s| s.trim());
        let is_blank = raw.map(|s| s.is_empty()).unwrap_or(true);

        if is_blank {
            if col.nullable {
                values.insert(col.name.clone(), CoercedValue::Null);
            } else {
                errors.push(SchemaViolation::null_not_allowed(&col.name));
            }
            continue;
        }
        let raw = raw.unwrap();

        match coerce_scalar(col, raw) {
            Ok(value) => {
                if let Some(violation) = check_constraints(col, raw, &value) {
                    errors.push(violation);
                }
                values.insert(col.name.clone(), value);
            }
            Err(violation) => errors.push(violation),
        }
    }

    (values, errors)
}

fn coerce_scalar(col: &ColumnSpec, raw: &str) -> Result<CoercedValue, SchemaViolation> {
    match col.data_type {
        DataType::Text => Ok(CoercedValue::Text(raw.to_string())),
        DataType::Bool => match raw {
            "Y" | "y" => Ok(CoercedValue::Bool(true)),
            "N" | "n" => Ok(CoercedValue::Bool(false)),
            other => other
                .parse::<bool>()
                .map(CoercedValue::Bool)
                .map_err(|_| SchemaViolation::type_mismatch(&col.name, DataType::Bool, raw)),
        },
        DataType::Int => match raw {
            "OK" | "ok" => Ok(CoercedValue::Int(1)),
            "NG" | "ng" => Ok(CoercedValue::Int(0)),
            other => other
                .parse::<i64>()
                .map(CoercedValue::Int)
                .map_err(|_| SchemaViolation::type_mismatch(&col.name, DataType::Int, raw)),
        },
        DataType::Float => raw
            .parse::<f64>()
            .map(CoercedValue::Float)
            .map_err(|_| SchemaViolation::type_mismatch(&col.name, DataType::Float, raw)),
        DataType::Date => parse_date_value(raw)
            .map(CoercedValue::Date)
            .map_err(|_| SchemaViolation::format_mismatch(&col.name, "E_DATE_FORMAT", raw)),
    }
}

fn check_constraints(col: &ColumnSpec, raw: &str, value: &CoercedValue) -> Option<SchemaViolation> {
    if let Some(values) = &col.enum_values {
        if !values.iter().any(|v| v == raw) {
            return Some(SchemaViolation {
                field: col.name.clone(),
                error_code: "E_ENUM".to_string(),
                message: format!("{raw:?} is not one of {values:?}"),
                value: Some(raw.to_string()),
            });
        }
    }

    if let Some((min, max)) = col.range {
        let numeric = match value {
            CoercedValue::Int(i) => Some(*i as f64),
            CoercedValue::Float(f) => Some(*f),
            _ => None,
        };
        if let Some(n) = numeric {
            if n < min || n > max {
                return Some(SchemaViolation {
                    field: col.name.clone(),
                    error_code: "E_RANGE".to_string(),
                    message: format!("{n} is outside the range [{min}, {max}]"),
                    value: Some(raw.to_string()),
                });
            }
        }
    }

    if let Some(pattern) = &col.regex {
        if !regex_match(pattern, raw) {
            return Some(SchemaViolation::format_mismatch(&col.name, "E_REGEX", raw));
        }
    }

    None
}

/// Whole-value regex match. A column's `regex` is a full format contract
/// (`H[258]`, `P-\d{4}`), not a substring search, so the pattern is
/// anchored at both ends regardless of what the tenant wrote.
fn regex_match(pattern: &str, value: &str) -> bool {
    let anchored = format!("^(?:{pattern})$");
    match Regex::new(&anchored) {
        Ok(re) => re.is_match(value),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn missing_required_column_reports_e_required() {
        let cols = vec![ColumnSpec::required("lot_no", DataType::Text)];
        let (_, errors) = validate_row(&cols, &row(&[]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_code, "E_REQUIRED");
    }

    #[test]
    fn y_n_shorthand_coerces_to_bool() {
        let cols = vec![ColumnSpec::required("appearance_ok", DataType::Bool)];
        let (values, errors) = validate_row(&cols, &row(&[("appearance_ok", "Y")]));
        assert!(errors.is_empty());
        assert_eq!(values["appearance_ok"], CoercedValue::Bool(true));
    }

    #[test]
    fn ok_ng_shorthand_coerces_to_int() {
        let cols = vec![ColumnSpec::required("slitting_result", DataType::Int)];
        let (values, errors) = validate_row(&cols, &row(&[("slitting_result", "NG")]));
        assert!(errors.is_empty());
        assert_eq!(values["slitting_result"], CoercedValue::Int(0));
    }

    #[test]
    fn collects_every_column_error_in_one_pass() {
        let cols = vec![
            ColumnSpec::required("a", DataType::Int),
            ColumnSpec::required("b", DataType::Int),
        ];
        let (_, errors) = validate_row(&cols, &row(&[("a", "x"), ("b", "y")]));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn enum_violation_reports_e_enum() {
        let cols = vec![ColumnSpec::required("material", DataType::Text)
            .with_enum_values(vec!["H2".to_string(), "H5".to_string(), "H8".to_string()])];
        let (_, errors) = validate_row(&cols, &row(&[("material", "H9")]));
        assert_eq!(errors[0].error_code, "E_ENUM");
    }

    #[test]
    fn range_violation_reports_e_range() {
        let cols = vec![ColumnSpec::required("thickness1", DataType::Float).with_range(0.0, 100.0)];
        let (_, errors) = validate_row(&cols, &row(&[("thickness1", "150")]));
        assert_eq!(errors[0].error_code, "E_RANGE");
    }

    #[test]
    fn regex_character_class_matches_as_real_regex() {
        let cols = vec![ColumnSpec::required("material", DataType::Text).with_regex("H[258]")];
        let (_, ok_errors) = validate_row(&cols, &row(&[("material", "H2")]));
        assert!(ok_errors.is_empty());

        let (_, bad_errors) = validate_row(&cols, &row(&[("material", "H3")]));
        assert_eq!(bad_errors[0].error_code, "E_REGEX");
    }

    #[test]
    fn regex_is_anchored_to_the_whole_value() {
        let cols = vec![ColumnSpec::required("code", DataType::Text).with_regex("P-[0-9]{4}")];
        let (_, errors) = validate_row(&cols, &row(&[("code", "P-1234-extra")]));
        assert_eq!(errors[0].error_code, "E_REGEX");
    }
}
