//! Schema version persistence, backed by `mfg_db`'s `SchemaStore`.

use mfg_db::{MfgDb, SchemaStore as _, SchemaVersionRow};
use mfg_ids::{SchemaVersionId, TenantId};
use mfg_protocol::TableCode;
use serde_json::Value;
use thiserror::Error;

use crate::contract::{ColumnSpec, SchemaVersion};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Db(#[from] mfg_db::DbError),

    #[error("stored schema_json did not decode into column specs: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Thin schema-version store sitting on top of [`MfgDb`]; converts
/// between the registry's domain types and the persisted row shape.
pub struct SchemaStorage {
    db: MfgDb,
}

impl SchemaStorage {
    pub fn new(db: MfgDb) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        schema_hash: &str,
        header_fingerprint: &str,
        columns: Vec<ColumnSpec>,
    ) -> Result<SchemaVersion, StorageError> {
        let schema_json = serde_json::to_value(&columns)?;
        let row = self
            .db
            .schema_versions()
            .register(tenant_id, table_code, schema_hash, header_fingerprint, schema_json)
            .await?;
        row_to_version(row)
    }

    pub async fn find_by_fingerprint(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        header_fingerprint: &str,
    ) -> Result<Option<SchemaVersion>, StorageError> {
        let row = self
            .db
            .schema_versions()
            .resolve_by_fingerprint(tenant_id, table_code, header_fingerprint)
            .await?;
        row.map(row_to_version).transpose()
    }

    pub async fn get(&self, id: &SchemaVersionId) -> Result<SchemaVersion, StorageError> {
        let row = self.db.schema_versions().get(id).await?;
        row_to_version(row)
    }

    pub async fn get_flatten_columns(&self, tenant_id: &TenantId) -> Result<Option<Value>, StorageError> {
        Ok(self.db.schema_versions().get_flatten_columns(tenant_id).await?)
    }

    pub async fn set_flatten_columns(&self, tenant_id: &TenantId, columns: Value) -> Result<(), StorageError> {
        self.db.schema_versions().set_flatten_columns(tenant_id, columns).await?;
        Ok(())
    }
}

fn row_to_version(row: SchemaVersionRow) -> Result<SchemaVersion, StorageError> {
    let columns: Vec<ColumnSpec> = serde_json::from_value(row.schema_json)?;
    Ok(SchemaVersion {
        id: SchemaVersionId::parse(&row.id).expect("db-issued id is always a valid uuid"),
        tenant_id: TenantId::parse(&row.tenant_id).expect("db-issued id is always a valid uuid"),
        table_code: row
            .table_code
            .parse()
            .expect("db only ever stores a valid table code"),
        schema_hash: row.schema_hash,
        header_fingerprint: row.header_fingerprint,
        columns,
        created_at: row.created_at,
    })
}
