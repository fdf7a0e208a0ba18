//! Small DTOs shared across crates: the table-kind tag, pagination
//! envelope, and the resolved-caller identity auth produces.

use mfg_ids::{ApiKeyId, TenantId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which of the three correlated record kinds a file, job, or schema
/// version belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TableCode {
    P1,
    P2,
    P3,
}

impl TableCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableCode::P1 => "P1",
            TableCode::P2 => "P2",
            TableCode::P3 => "P3",
        }
    }
}

impl fmt::Display for TableCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCodeParseError(String);

impl fmt::Display for TableCodeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid table code: {}", self.0)
    }
}

impl std::error::Error for TableCodeParseError {}

impl FromStr for TableCode {
    type Err = TableCodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "P1" => Ok(TableCode::P1),
            "P2" => Ok(TableCode::P2),
            "P3" => Ok(TableCode::P3),
            other => Err(TableCodeParseError(other.to_string())),
        }
    }
}

/// Pagination request/response envelope used by the query surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    pub const DEFAULT_PAGE_SIZE: u32 = 50;
    pub const MAX_PAGE_SIZE: u32 = 500;

    pub fn new(page: u32, page_size: u32) -> Self {
        let page = page.max(1);
        let page_size = page_size.clamp(1, Self::MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        ((self.page - 1) as i64) * (self.page_size as i64)
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PAGE_SIZE)
    }
}

/// Canonical scalar types a column spec can declare, shared between the
/// schema registry and the validation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Int,
    Float,
    Bool,
    Text,
    Date,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Int => "Int",
            DataType::Float => "Float",
            DataType::Bool => "Bool",
            DataType::Text => "Text",
            DataType::Date => "Date",
        };
        write!(f, "{}", s)
    }
}

/// The identity every core component receives once an inbound credential
/// has been resolved. Nothing downstream re-derives a tenant from a
/// header; this is the only form of caller identity the core accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCaller {
    pub tenant_id: TenantId,
    pub key_id: ApiKeyId,
    pub actor_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_code_roundtrips_through_string() {
        for code in [TableCode::P1, TableCode::P2, TableCode::P3] {
            let parsed: TableCode = code.as_str().parse().unwrap();
            assert_eq!(parsed, code);
        }
    }

    #[test]
    fn table_code_is_case_insensitive() {
        assert_eq!("p2".parse::<TableCode>().unwrap(), TableCode::P2);
    }

    #[test]
    fn pagination_clamps_page_size() {
        let p = Pagination::new(0, 10_000);
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, Pagination::MAX_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
    }
}
