//! Auth and rate-limit errors. Neither is part of the closed
//! `mfg_protocol::ErrorCode` vocabulary — both map to a plain HTTP
//! status (401, 429) at the transport boundary, which is outside this
//! crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no active api key matches the presented credential")]
    KeyNotFound,
    #[error(transparent)]
    Db(#[from] mfg_db::DbError),
}

#[derive(Debug, Error)]
#[error("rate limit exceeded for {key}")]
pub struct RateLimitError {
    pub key: String,
}
