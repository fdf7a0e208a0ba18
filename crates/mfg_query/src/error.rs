use mfg_protocol::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The opaque `trace_key` did not decode to a valid
    /// `(tenant_id, lot_no_norm)` pair, or decoded to a different
    /// tenant than the caller presenting it.
    #[error("trace key is malformed or does not belong to this tenant")]
    InvalidTraceKey,

    #[error(transparent)]
    Db(#[from] mfg_db::DbError),
}

impl QueryError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            // Closest existing code for "a reference the caller supplied
            // does not resolve"; trace_key has no dedicated code in the
            // closed vocabulary.
            QueryError::InvalidTraceKey => ErrorCode::EFkMissing,
            QueryError::Db(_) => ErrorCode::EInternal,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
