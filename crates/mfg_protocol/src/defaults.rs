//! Canonical default values for environment variables documented in
//! the external interfaces section of the requirements.

pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";
pub const DEFAULT_PROTECT_PREFIXES: &str = "/api";
pub const DEFAULT_EXEMPT_PATHS: &str = "/healthz,/docs,/openapi.json";
pub const DEFAULT_UPLOAD_TEMP_DIR: &str = "/tmp/mfg-uploads";
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: u64 = 10;
pub const DEFAULT_DB_POOL_SIZE: u32 = 10;
pub const DEFAULT_DB_MAX_OVERFLOW: u32 = 20;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;
pub const DEFAULT_AUTO_GZIP_THRESHOLD: usize = 200;
pub const DEFAULT_MAX_RECORDS_WARN: usize = 1500;
pub const DEFAULT_MAX_RECORDS_HARD_CAP: usize = 3000;
pub const DEFAULT_STAGING_ROW_RETENTION_DAYS: i64 = 7;
pub const CANCELLED_BY_USER_MESSAGE: &str = "Cancelled by user";
