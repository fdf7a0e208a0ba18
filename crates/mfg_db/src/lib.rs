//! Postgres-backed persistence layer for the ingestion and traceability
//! service.
//!
//! Schema versions, tenants, records, jobs, and staging rows each get a
//! narrow repository trait plus a `Pg*` implementation; `MfgDb` is the
//! facade other crates depend on so call sites never see `PgPool`
//! directly.

pub mod db;
pub mod error;
pub mod pool;
pub mod repo;
mod schema;

pub use db::MfgDb;
pub use error::{DbError, Result};
pub use pool::{create_pool, DbConfig, DbPool, DbRow};

pub use repo::job_store::{ImportFileRow, ImportJobRow, JobStatus, JobStore};
pub use repo::record_store::{
    LotBundle, P1Row, P2ItemInput, P2ItemRow, P2Row, P3ItemInput, P3ItemRow, P3Row, RecordStore,
};
pub use repo::schema_store::{SchemaStore, SchemaVersionRow};
pub use repo::search_store::{DistinctValue, EnumerableColumn, SearchFilters, SearchHit, SearchStore};
pub use repo::staging_store::{NewStagingRow, RowEditRecord, StagingRowRecord, StagingStore};
pub use repo::tenant::{ApiKeyRow, TenantRow, TenantStore};
