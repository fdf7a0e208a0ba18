//! The `MfgDb` facade: owns the pool, exposes one accessor per
//! repository trait, the way the reference repository exposes
//! `.queue()`/`.api()`/`.scout()` over a single `StateStore`.

use crate::error::Result;
use crate::pool::DbPool;
use crate::repo::job_store::{JobStore, PgJobStore};
use crate::repo::record_store::{PgRecordStore, RecordStore};
use crate::repo::schema_store::{PgSchemaStore, SchemaStore};
use crate::repo::search_store::{PgSearchStore, SearchStore};
use crate::repo::staging_store::{PgStagingStore, StagingStore};
use crate::repo::tenant::{PgTenantStore, TenantStore};

#[derive(Clone)]
pub struct MfgDb {
    pool: DbPool,
}

impl MfgDb {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        crate::schema::ensure_schema(&self.pool).await
    }

    pub fn tenants(&self) -> impl TenantStore + '_ {
        PgTenantStore::new(&self.pool)
    }

    pub fn schema_versions(&self) -> impl SchemaStore + '_ {
        PgSchemaStore::new(&self.pool)
    }

    pub fn records(&self) -> impl RecordStore + '_ {
        PgRecordStore::new(&self.pool)
    }

    pub fn jobs(&self) -> impl JobStore + '_ {
        PgJobStore::new(&self.pool)
    }

    pub fn staging(&self) -> impl StagingStore + '_ {
        PgStagingStore::new(&self.pool)
    }

    pub fn search(&self) -> impl SearchStore + '_ {
        PgSearchStore::new(&self.pool)
    }
}
