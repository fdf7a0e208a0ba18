//! Pipeline-level errors: batch uniformity failures, duplicates, and
//! wrapped lower-layer errors, all mapped onto the closed error-code
//! vocabulary.

use mfg_protocol::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("files in this batch do not share the same format")]
    BatchMixedFormat,

    #[error("files in this batch do not share the same header")]
    BatchMixedSchema,

    #[error("files in this batch do not share the same tenant")]
    BatchMixedTenant,

    #[error("a file with this content was already committed for this table")]
    FileDuplicate,

    #[error("header does not match any registered schema version")]
    HeaderMismatch,

    #[error("job is not in a state that allows this operation")]
    InvalidState,

    #[error(transparent)]
    Db(#[from] mfg_db::DbError),

    #[error(transparent)]
    Schema(#[from] mfg_schema::RegistryError),

    #[error(transparent)]
    Parse(#[from] mfg_parser::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PipelineError::BatchMixedFormat => ErrorCode::EBatchMixedFormat,
            PipelineError::BatchMixedSchema => ErrorCode::EBatchMixedSchema,
            PipelineError::BatchMixedTenant => ErrorCode::EBatchMixedTenant,
            PipelineError::FileDuplicate => ErrorCode::EFileDuplicate,
            PipelineError::HeaderMismatch => ErrorCode::EHeaderMismatch,
            PipelineError::InvalidState => ErrorCode::EInternal,
            PipelineError::Db(_) | PipelineError::Parse(_) | PipelineError::Io(_) => ErrorCode::EInternal,
            PipelineError::Schema(e) => e.error_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
