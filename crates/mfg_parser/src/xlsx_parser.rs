//! XLSX parsing via `calamine`. `.xls` (legacy binary Excel) is
//! rejected before this module is ever reached — see
//! [`crate::FileFormat::from_filename`].

use std::collections::BTreeMap;
use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use serde_json::Value;

use crate::{ParseError, StagingRowData};

/// Read just the header row of the first worksheet.
pub fn read_xlsx_header(bytes: &[u8]) -> Result<Vec<String>, ParseError> {
    let cursor = Cursor::new(bytes);
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(cursor).map_err(|e| ParseError::Xlsx(e.to_string()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ParseError::Xlsx("workbook has no worksheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ParseError::Xlsx(e.to_string()))?;
    let header = range
        .rows()
        .next()
        .ok_or_else(|| ParseError::Xlsx("worksheet has no header row".to_string()))?;
    Ok(header.iter().map(cell_to_string).collect())
}

/// Parse the first worksheet of an XLSX file into staging rows keyed by
/// the given canonical column names.
pub fn parse_xlsx(bytes: &[u8], columns: &[String]) -> Result<Vec<StagingRowData>, ParseError> {
    let cursor = Cursor::new(bytes);
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(cursor).map_err(|e| ParseError::Xlsx(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ParseError::Xlsx("workbook has no worksheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ParseError::Xlsx(e.to_string()))?;

    let mut rows = Vec::new();
    let mut row_index: i64 = 0;

    for record in range.rows().skip(1) {
        if record.iter().all(cell_is_blank) {
            continue;
        }
        row_index += 1;

        let mut map = BTreeMap::new();
        for (name, cell) in columns.iter().zip(record.iter()) {
            map.insert(name.clone(), Value::String(cell_to_string(cell)));
        }
        rows.push(StagingRowData {
            row_index,
            parsed_json: Value::Object(map.into_iter().collect()),
        });
    }

    Ok(rows)
}

fn cell_is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERROR:{e:?}"),
    }
}
