//! Tenant and API-key persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mfg_ids::{ApiKeyId, TenantId};
use sqlx::PgPool;

use crate::error::{DbError, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TenantRow {
    pub id: String,
    pub code: String,
    pub name: String,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKeyRow {
    pub id: String,
    pub tenant_id: String,
    pub key_hash: String,
    pub label: String,
    pub is_active: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn create_tenant(&self, code: &str, name: &str, is_default: bool) -> Result<TenantRow>;
    async fn get_tenant(&self, id: &TenantId) -> Result<TenantRow>;
    async fn get_tenant_by_code(&self, code: &str) -> Result<Option<TenantRow>>;
    async fn list_tenants(&self) -> Result<Vec<TenantRow>>;

    async fn create_api_key(
        &self,
        tenant_id: &TenantId,
        key_hash: &str,
        label: &str,
    ) -> Result<ApiKeyRow>;
    async fn resolve_by_key_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRow>>;
    async fn touch_last_used(&self, key_id: &ApiKeyId) -> Result<()>;
}

pub struct PgTenantStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgTenantStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl<'a> TenantStore for PgTenantStore<'a> {
    async fn create_tenant(&self, code: &str, name: &str, is_default: bool) -> Result<TenantRow> {
        let id = TenantId::new();
        let row = sqlx::query_as::<_, TenantRow>(
            r#"INSERT INTO tenants (id, code, name, is_default, is_active)
               VALUES ($1, $2, $3, $4, TRUE)
               RETURNING id, code, name, is_default, is_active, created_at"#,
        )
        .bind(id.as_str())
        .bind(code)
        .bind(name)
        .bind(is_default)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::constraint(format!("tenant code already exists: {}", code))
            }
            _ => DbError::Sqlx(e),
        })?;
        Ok(row)
    }

    async fn get_tenant(&self, id: &TenantId) -> Result<TenantRow> {
        sqlx::query_as::<_, TenantRow>(
            "SELECT id, code, name, is_default, is_active, created_at FROM tenants WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(format!("tenant {}", id)))
    }

    async fn get_tenant_by_code(&self, code: &str) -> Result<Option<TenantRow>> {
        let row = sqlx::query_as::<_, TenantRow>(
            "SELECT id, code, name, is_default, is_active, created_at FROM tenants WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    async fn list_tenants(&self) -> Result<Vec<TenantRow>> {
        let rows = sqlx::query_as::<_, TenantRow>(
            "SELECT id, code, name, is_default, is_active, created_at FROM tenants ORDER BY code",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_api_key(
        &self,
        tenant_id: &TenantId,
        key_hash: &str,
        label: &str,
    ) -> Result<ApiKeyRow> {
        let id = ApiKeyId::new();
        let row = sqlx::query_as::<_, ApiKeyRow>(
            r#"INSERT INTO tenant_api_keys (id, tenant_id, key_hash, label, is_active)
               VALUES ($1, $2, $3, $4, TRUE)
               RETURNING id, tenant_id, key_hash, label, is_active, revoked_at, last_used_at, created_at"#,
        )
        .bind(id.as_str())
        .bind(tenant_id.as_str())
        .bind(key_hash)
        .bind(label)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    async fn resolve_by_key_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRow>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            r#"SELECT id, tenant_id, key_hash, label, is_active, revoked_at, last_used_at, created_at
               FROM tenant_api_keys WHERE key_hash = $1 AND is_active AND revoked_at IS NULL"#,
        )
        .bind(key_hash)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    async fn touch_last_used(&self, key_id: &ApiKeyId) -> Result<()> {
        sqlx::query("UPDATE tenant_api_keys SET last_used_at = now() WHERE id = $1")
            .bind(key_id.as_str())
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
