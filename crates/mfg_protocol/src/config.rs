//! Typed configuration assembled once from the environment at startup.
//!
//! Every env lookup in the workspace goes through `AppConfig::from_env`
//! rather than scattered `std::env::var` calls in business logic.

use crate::defaults;
use crate::error::{ProtocolError, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Off,
    ApiKey,
}

/// Canonical system configuration for the ingestion/traceability core.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub auth_mode: AuthMode,
    pub auth_api_key_header: String,
    pub auth_protect_prefixes: Vec<String>,
    pub auth_exempt_paths: Vec<String>,
    pub auth_hmac_secret: String,
    pub upload_temp_dir: PathBuf,
    pub max_upload_size_mb: u64,
    pub db_pool_size: u32,
    pub db_max_overflow: u32,
    pub rate_limit_per_minute: u32,
    pub auto_gzip_threshold: usize,
    pub max_records_warn: usize,
    pub max_records_hard_cap: usize,
    pub staging_row_retention_days: i64,
}

impl AppConfig {
    /// Build configuration from the process environment, applying the
    /// documented defaults for anything unset. `DATABASE_URL` and
    /// `AUTH_HMAC_SECRET` have no default and are required.
    pub fn from_env() -> Result<Self> {
        let database_url = require_env("DATABASE_URL")?;
        let auth_hmac_secret = require_env("AUTH_HMAC_SECRET")?;

        let auth_mode = match env_or("AUTH_MODE", "api_key").as_str() {
            "off" => AuthMode::Off,
            "api_key" => AuthMode::ApiKey,
            other => {
                return Err(ProtocolError::InvalidEnv {
                    name: "AUTH_MODE".into(),
                    value: other.into(),
                })
            }
        };

        Ok(Self {
            database_url,
            auth_mode,
            auth_api_key_header: env_or("AUTH_API_KEY_HEADER", defaults::DEFAULT_API_KEY_HEADER),
            auth_protect_prefixes: split_csv(&env_or(
                "AUTH_PROTECT_PREFIXES",
                defaults::DEFAULT_PROTECT_PREFIXES,
            )),
            auth_exempt_paths: split_csv(&env_or(
                "AUTH_EXEMPT_PATHS",
                defaults::DEFAULT_EXEMPT_PATHS,
            )),
            auth_hmac_secret,
            upload_temp_dir: PathBuf::from(env_or(
                "UPLOAD_TEMP_DIR",
                defaults::DEFAULT_UPLOAD_TEMP_DIR,
            )),
            max_upload_size_mb: parse_env_or("MAX_UPLOAD_SIZE_MB", defaults::DEFAULT_MAX_UPLOAD_SIZE_MB)?,
            db_pool_size: parse_env_or("DB_POOL_SIZE", defaults::DEFAULT_DB_POOL_SIZE)?,
            db_max_overflow: parse_env_or("DB_MAX_OVERFLOW", defaults::DEFAULT_DB_MAX_OVERFLOW)?,
            rate_limit_per_minute: parse_env_or(
                "RATE_LIMIT_PER_MINUTE",
                defaults::DEFAULT_RATE_LIMIT_PER_MINUTE,
            )?,
            auto_gzip_threshold: parse_env_or(
                "AUTO_GZIP_THRESHOLD",
                defaults::DEFAULT_AUTO_GZIP_THRESHOLD,
            )?,
            max_records_warn: parse_env_or(
                "MAX_RECORDS_WARN",
                defaults::DEFAULT_MAX_RECORDS_WARN,
            )?,
            max_records_hard_cap: parse_env_or(
                "MAX_RECORDS_HARD_CAP",
                defaults::DEFAULT_MAX_RECORDS_HARD_CAP,
            )?,
            staging_row_retention_days: parse_env_or(
                "STAGING_ROW_RETENTION_DAYS",
                defaults::DEFAULT_STAGING_ROW_RETENTION_DAYS,
            )?,
        })
    }

    /// Total pool capacity sqlx should be configured with.
    pub fn max_connections(&self) -> u32 {
        self.db_pool_size + self.db_max_overflow
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ProtocolError::MissingEnv(name.to_string()))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| ProtocolError::InvalidEnv {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
