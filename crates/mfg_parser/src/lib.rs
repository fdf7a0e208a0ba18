//! File parsing: turns an uploaded CSV or XLSX file into a stream of
//! staging rows. No coercion happens here — `parsed_json` carries raw
//! cell strings keyed by canonical column name; the validation engine
//! owns type coercion.

pub mod csv_parser;
pub mod hash;
pub mod xlsx_parser;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("xlsx error: {0}")]
    Xlsx(String),
    #[error(".xls (legacy binary Excel) is not supported, convert to .xlsx or .csv")]
    LegacyXlsNotSupported,
    #[error("file exceeds the maximum upload size")]
    TooLarge,
    #[error("unrecognized file extension {0:?}")]
    UnsupportedExtension(String),
}

/// One parsed data row: 1-based `row_index` against the non-blank data
/// row sequence (blank lines are skipped and never counted), and the
/// raw cell values keyed by canonical column name.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingRowData {
    pub row_index: i64,
    pub parsed_json: Value,
}

/// Which on-disk format a file was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    pub fn from_filename(name: &str) -> Result<Self, ParseError> {
        let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            "xls" => Err(ParseError::LegacyXlsNotSupported),
            other => Err(ParseError::UnsupportedExtension(other.to_string())),
        }
    }
}

/// Parse a file's bytes, given the ordered canonical column names the
/// header has already been confirmed to match.
pub fn parse_bytes(format: FileFormat, bytes: &[u8], columns: &[String]) -> Result<Vec<StagingRowData>, ParseError> {
    match format {
        FileFormat::Csv => csv_parser::parse_csv(bytes, columns),
        FileFormat::Xlsx => xlsx_parser::parse_xlsx(bytes, columns),
    }
}

/// Read just the header row, before the schema version (and therefore
/// the canonical column list to parse the rest of the file against) is
/// known.
pub fn read_header(format: FileFormat, bytes: &[u8]) -> Result<Vec<String>, ParseError> {
    match format {
        FileFormat::Csv => csv_parser::read_csv_header(bytes),
        FileFormat::Xlsx => xlsx_parser::read_xlsx_header(bytes),
    }
}
