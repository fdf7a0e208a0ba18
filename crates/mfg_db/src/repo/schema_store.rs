//! Schema-version persistence. Versions are immutable once created:
//! registering new headers for a `(tenant, table_code)` inserts a new
//! row rather than mutating an existing one, which is what makes the
//! process-local schema cache in the registry crate safe without an
//! invalidation path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mfg_ids::{SchemaVersionId, TenantId};
use mfg_protocol::TableCode;
use serde_json::Value;
use sqlx::PgPool;

use crate::error::{DbError, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SchemaVersionRow {
    pub id: String,
    pub tenant_id: String,
    pub table_code: String,
    pub schema_hash: String,
    pub header_fingerprint: String,
    pub schema_json: Value,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait SchemaStore: Send + Sync {
    async fn register(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        schema_hash: &str,
        header_fingerprint: &str,
        schema_json: Value,
    ) -> Result<SchemaVersionRow>;

    async fn resolve_by_fingerprint(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        header_fingerprint: &str,
    ) -> Result<Option<SchemaVersionRow>>;

    async fn get(&self, id: &SchemaVersionId) -> Result<SchemaVersionRow>;

    async fn get_flatten_columns(&self, tenant_id: &TenantId) -> Result<Option<Value>>;
    async fn set_flatten_columns(&self, tenant_id: &TenantId, columns: Value) -> Result<()>;
}

pub struct PgSchemaStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgSchemaStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl<'a> SchemaStore for PgSchemaStore<'a> {
    async fn register(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        schema_hash: &str,
        header_fingerprint: &str,
        schema_json: Value,
    ) -> Result<SchemaVersionRow> {
        let id = SchemaVersionId::new();
        let row = sqlx::query_as::<_, SchemaVersionRow>(
            r#"INSERT INTO schema_versions (id, tenant_id, table_code, schema_hash, header_fingerprint, schema_json)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, tenant_id, table_code, schema_hash, header_fingerprint, schema_json, created_at"#,
        )
        .bind(id.as_str())
        .bind(tenant_id.as_str())
        .bind(table_code.as_str())
        .bind(schema_hash)
        .bind(header_fingerprint)
        .bind(schema_json)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    async fn resolve_by_fingerprint(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        header_fingerprint: &str,
    ) -> Result<Option<SchemaVersionRow>> {
        let row = sqlx::query_as::<_, SchemaVersionRow>(
            r#"SELECT id, tenant_id, table_code, schema_hash, header_fingerprint, schema_json, created_at
               FROM schema_versions
               WHERE tenant_id = $1 AND table_code = $2 AND header_fingerprint = $3"#,
        )
        .bind(tenant_id.as_str())
        .bind(table_code.as_str())
        .bind(header_fingerprint)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    async fn get(&self, id: &SchemaVersionId) -> Result<SchemaVersionRow> {
        sqlx::query_as::<_, SchemaVersionRow>(
            r#"SELECT id, tenant_id, table_code, schema_hash, header_fingerprint, schema_json, created_at
               FROM schema_versions WHERE id = $1"#,
        )
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(format!("schema version {}", id)))
    }

    async fn get_flatten_columns(&self, tenant_id: &TenantId) -> Result<Option<Value>> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT columns_json FROM tenant_flatten_columns WHERE tenant_id = $1")
                .bind(tenant_id.as_str())
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|(v,)| v))
    }

    async fn set_flatten_columns(&self, tenant_id: &TenantId, columns: Value) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO tenant_flatten_columns (tenant_id, map_version, columns_json)
               VALUES ($1, 1, $2)
               ON CONFLICT (tenant_id) DO UPDATE
               SET columns_json = EXCLUDED.columns_json,
                   map_version = tenant_flatten_columns.map_version + 1,
                   updated_at = now()"#,
        )
        .bind(tenant_id.as_str())
        .bind(columns)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
