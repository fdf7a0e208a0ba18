//! Postgres pool creation.
//!
//! Unlike the sqlx::AnyPool approach, we use the concrete `PgPool` type,
//! which gives full support for `#[derive(sqlx::FromRow)]` with custom
//! column types (enums, `DateTime<Utc>`, `serde_json::Value`).

use tracing::info;

use crate::error::{DbError, Result};

pub type DbPool = sqlx::PgPool;
pub type DbRow = sqlx::postgres::PgRow;

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            min_connections: 1,
            max_connections: 10,
        }
    }

    pub fn with_pool_size(mut self, min_connections: u32, max_connections: u32) -> Self {
        self.min_connections = min_connections;
        self.max_connections = max_connections;
        self
    }

    /// Build configuration from an `AppConfig`, so `DB_POOL_SIZE` maps to
    /// `min_connections` and `DB_POOL_SIZE + DB_MAX_OVERFLOW` to
    /// `max_connections`.
    pub fn from_app_config(config: &mfg_protocol::config::AppConfig) -> Self {
        Self {
            url: config.database_url.clone(),
            min_connections: config.db_pool_size,
            max_connections: config.max_connections(),
        }
    }
}

/// Create a Postgres pool from configuration.
pub async fn create_pool(config: DbConfig) -> Result<DbPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .map_err(DbError::Sqlx)?;

    info!(
        max_connections = config.max_connections,
        "connected to postgres"
    );
    Ok(pool)
}
