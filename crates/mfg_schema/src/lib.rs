//! Schema registry: header fingerprinting, immutable schema versions,
//! and the per-(tenant, table_code) resolution the validation engine and
//! file parser depend on.
//!
//! # Modules
//!
//! - [`contract`]: `SchemaVersion`, `ColumnSpec`, `SchemaViolation`.
//! - [`fingerprint`]: header canonicalization and sha256 fingerprinting.
//! - [`storage`]: Postgres-backed persistence via `mfg_db`.
//! - [`registry`]: cached resolve/register surface other crates call.

pub mod contract;
pub mod fingerprint;
pub mod registry;
pub mod storage;

pub use contract::{ColumnSpec, SchemaVersion, SchemaViolation};
pub use registry::{RegistryError, SchemaRegistry};
pub use storage::{SchemaStorage, StorageError};
