//! The closed error-code vocabulary shared by every validation and
//! ingestion path, plus the top-level protocol error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed vocabulary of error codes a staging row, a job, or the
/// flattener can surface. Every crate-local error enum maps one or more
/// of its variants onto one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ERequired,
    EType,
    ERange,
    EEnum,
    ERegex,
    ELotFormat,
    EDateFormat,
    EHeaderMismatch,
    EUniqueInFile,
    EUniqueInDb,
    EFkMissing,
    EBatchMixedFormat,
    EBatchMixedSchema,
    EBatchMixedTenant,
    EFileDuplicate,
    EResultTooLarge,
    EInternal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ERequired => "E_REQUIRED",
            ErrorCode::EType => "E_TYPE",
            ErrorCode::ERange => "E_RANGE",
            ErrorCode::EEnum => "E_ENUM",
            ErrorCode::ERegex => "E_REGEX",
            ErrorCode::ELotFormat => "E_LOT_FORMAT",
            ErrorCode::EDateFormat => "E_DATE_FORMAT",
            ErrorCode::EHeaderMismatch => "E_HEADER_MISMATCH",
            ErrorCode::EUniqueInFile => "E_UNIQUE_IN_FILE",
            ErrorCode::EUniqueInDb => "E_UNIQUE_IN_DB",
            ErrorCode::EFkMissing => "E_FK_MISSING",
            ErrorCode::EBatchMixedFormat => "E_BATCH_MIXED_FORMAT",
            ErrorCode::EBatchMixedSchema => "E_BATCH_MIXED_SCHEMA",
            ErrorCode::EBatchMixedTenant => "E_BATCH_MIXED_TENANT",
            ErrorCode::EFileDuplicate => "E_FILE_DUPLICATE",
            ErrorCode::EResultTooLarge => "E_RESULT_TOO_LARGE",
            ErrorCode::EInternal => "E_INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while assembling or validating shared protocol
/// values (currently just configuration parsing).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("missing required environment variable {0}")]
    MissingEnv(String),

    #[error("invalid value for environment variable {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
