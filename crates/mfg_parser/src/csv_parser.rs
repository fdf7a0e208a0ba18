//! CSV parsing: UTF-8, BOM tolerated. Blank lines are skipped entirely
//! and never counted toward `row_index`.

use std::collections::BTreeMap;

use csv::ReaderBuilder;
use serde_json::Value;

use crate::{ParseError, StagingRowData};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Read just the header row, for fingerprinting and schema resolution
/// before the rest of the file is parsed.
pub fn read_csv_header(bytes: &[u8]) -> Result<Vec<String>, ParseError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(body);
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

/// Parse CSV bytes into staging rows keyed by the given canonical
/// column names (already confirmed to match the file's header).
pub fn parse_csv(bytes: &[u8], columns: &[String]) -> Result<Vec<StagingRowData>, ParseError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(body);

    let mut rows = Vec::new();
    let mut row_index: i64 = 0;

    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        row_index += 1;

        let mut map = BTreeMap::new();
        for (name, cell) in columns.iter().zip(record.iter()) {
            map.insert(name.clone(), Value::String(cell.to_string()));
        }
        rows.push(StagingRowData {
            row_index,
            parsed_json: Value::Object(map.into_iter().collect()),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_skips_blank_lines() {
        let csv = "lot_no,winder\n1234567-89,1\n\n1234567-90,2\n";
        let columns = vec!["lot_no".to_string(), "winder".to_string()];
        let rows = parse_csv(csv.as_bytes(), &columns).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_index, 1);
        assert_eq!(rows[1].row_index, 2);
        assert_eq!(rows[1].parsed_json["lot_no"], "1234567-90");
    }

    #[test]
    fn strips_leading_utf8_bom() {
        let mut csv = UTF8_BOM.to_vec();
        csv.extend_from_slice(b"lot_no\n1234567-89\n");
        let columns = vec!["lot_no".to_string()];
        let rows = parse_csv(&csv, &columns).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].parsed_json["lot_no"], "1234567-89");
    }
}
