use mfg_protocol::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("at most {max} product ids are accepted per request, got {got}")]
    TooManyProductIds { max: usize, got: usize },

    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),

    #[error("result has {rows} rows, the hard cap is {cap}")]
    ResultTooLarge { rows: usize, cap: usize },

    #[error(transparent)]
    Db(#[from] mfg_db::DbError),

    #[error(transparent)]
    Registry(#[from] mfg_schema::RegistryError),

    #[error("gzip compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

impl TraceError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            TraceError::TooManyProductIds { .. } => ErrorCode::ERange,
            TraceError::InvalidMonth(_) => ErrorCode::ERange,
            TraceError::ResultTooLarge { .. } => ErrorCode::EResultTooLarge,
            TraceError::Db(_) => ErrorCode::EInternal,
            TraceError::Registry(_) => ErrorCode::EInternal,
            TraceError::Compression(_) => ErrorCode::EInternal,
        }
    }
}

pub type Result<T> = std::result::Result<T, TraceError>;
