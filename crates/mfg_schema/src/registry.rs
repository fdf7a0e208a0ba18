//! The schema registry: resolves a header row to a [`SchemaVersion`] and
//! registers new versions (an admin-only operation, not something the
//! ingestion pipeline does on its own).
//!
//! Versions are immutable once persisted, so a process-local cache keyed
//! by `(tenant, table_code, header_fingerprint)` needs no invalidation
//! path — once a fingerprint resolves, the answer never changes.

use std::collections::HashMap;
use std::sync::RwLock;

use mfg_ids::{SchemaVersionId, TenantId};
use mfg_protocol::{ErrorCode, TableCode};
use serde_json::Value;

use crate::contract::{ColumnSpec, SchemaVersion};
use crate::fingerprint::fingerprint_raw_header;
use crate::storage::SchemaStorage;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no schema version registered for this header")]
    HeaderMismatch,
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
}

impl RegistryError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            RegistryError::HeaderMismatch => ErrorCode::EHeaderMismatch,
            RegistryError::Storage(_) => ErrorCode::EInternal,
        }
    }
}

type CacheKey = (TenantId, TableCode, String);

/// Schema version cache plus storage-backed registration, safe to share
/// across a process via `Arc<SchemaRegistry>`.
pub struct SchemaRegistry {
    storage: SchemaStorage,
    cache: RwLock<HashMap<CacheKey, SchemaVersion>>,
}

impl SchemaRegistry {
    pub fn new(storage: SchemaStorage) -> Self {
        Self {
            storage,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a raw header row to its schema version. Unknown
    /// fingerprints fail; there is no implicit registration here.
    pub async fn resolve(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        header_row: &[&str],
    ) -> Result<SchemaVersion, RegistryError> {
        let fp = fingerprint_raw_header(header_row);
        let key = (tenant_id.clone(), table_code, fp.clone());

        if let Some(hit) = self.cache.read().expect("cache lock poisoned").get(&key) {
            return Ok(hit.clone());
        }

        let version = self
            .storage
            .find_by_fingerprint(tenant_id, table_code, &fp)
            .await?
            .ok_or(RegistryError::HeaderMismatch)?;

        self.cache
            .write()
            .expect("cache lock poisoned")
            .insert(key, version.clone());
        Ok(version)
    }

    /// Register a new schema version for `(tenant, table_code)`. Always
    /// inserts a new row; never mutates a prior version even if the
    /// column specs are identical to one already on file.
    pub async fn register(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        header_row: &[&str],
        columns: Vec<ColumnSpec>,
    ) -> Result<SchemaVersion, RegistryError> {
        let fp = fingerprint_raw_header(header_row);
        let schema_hash = schema_hash(&columns);
        let version = self
            .storage
            .insert(tenant_id, table_code, &schema_hash, &fp, columns)
            .await?;

        let key = (tenant_id.clone(), table_code, fp);
        self.cache
            .write()
            .expect("cache lock poisoned")
            .insert(key, version.clone());
        Ok(version)
    }

    pub async fn get(&self, id: &SchemaVersionId) -> Result<SchemaVersion, RegistryError> {
        Ok(self.storage.get(id).await?)
    }

    pub async fn flatten_columns(&self, tenant_id: &TenantId) -> Result<Option<Value>, RegistryError> {
        Ok(self.storage.get_flatten_columns(tenant_id).await?)
    }

    pub async fn set_flatten_columns(&self, tenant_id: &TenantId, columns: Value) -> Result<(), RegistryError> {
        self.storage.set_flatten_columns(tenant_id, columns).await?;
        Ok(())
    }
}

/// Advisory hash of a column-spec list, used as a human-legible tag on
/// the version row; not load-bearing for lookups (the fingerprint is).
fn schema_hash(columns: &[ColumnSpec]) -> String {
    use sha2::{Digest, Sha256};
    let encoded = serde_json::to_vec(columns).expect("column specs always serialize");
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfg_protocol::DataType;

    #[test]
    fn schema_hash_is_stable_for_equal_specs() {
        let a = vec![ColumnSpec::required("lot_no", DataType::Text)];
        let b = vec![ColumnSpec::required("lot_no", DataType::Text)];
        assert_eq!(schema_hash(&a), schema_hash(&b));
    }

    #[test]
    fn schema_hash_differs_when_specs_differ() {
        let a = vec![ColumnSpec::required("lot_no", DataType::Text)];
        let b = vec![ColumnSpec::optional("lot_no", DataType::Text)];
        assert_ne!(schema_hash(&a), schema_hash(&b));
    }
}
