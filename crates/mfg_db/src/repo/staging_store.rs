//! Staging-row persistence: the per-row parse/validation scratch space a
//! job writes to before a commit promotes accepted rows into the record
//! tables, plus the audit trail of manual row edits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mfg_ids::{ImportFileId, JobId, RowEditId, TenantId};
use mfg_protocol::TableCode;
use serde_json::Value;
use sqlx::PgPool;

use crate::error::{DbError, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StagingRowRecord {
    pub id: String,
    pub job_id: String,
    pub file_id: String,
    pub row_index: i64,
    pub parsed_json: Value,
    pub errors_json: Option<Value>,
}

pub struct NewStagingRow {
    pub file_id: ImportFileId,
    pub row_index: i64,
    pub parsed_json: Value,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RowEditRecord {
    pub id: String,
    pub tenant_id: String,
    pub table_code: String,
    pub record_id: String,
    pub before_json: Value,
    pub after_json: Value,
    pub reason_id: i16,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Insert a chunk of parsed rows for one job in a single round trip.
    async fn insert_rows(&self, job_id: &JobId, rows: &[NewStagingRow]) -> Result<()>;

    /// Attach validation errors to a previously staged row. `None` clears
    /// any existing errors (the row passed on re-validation).
    async fn set_row_errors(&self, row_id: &str, errors: Option<Value>) -> Result<()>;

    async fn list_rows(&self, job_id: &JobId, offset: i64, limit: i64) -> Result<Vec<StagingRowRecord>>;
    async fn list_error_rows(
        &self,
        job_id: &JobId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<StagingRowRecord>>;
    async fn count_error_rows(&self, job_id: &JobId) -> Result<i64>;

    async fn append_row_edit(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        record_id: &str,
        before_json: Value,
        after_json: Value,
        reason_id: i16,
        actor_id: &str,
    ) -> Result<RowEditRecord>;

    /// Delete staging rows (and their parent jobs' rows overall are left
    /// alone; only the row-level scratch data ages out) for jobs that
    /// finished more than `retention_days` ago. Returns the row count
    /// removed.
    async fn purge_expired(&self, retention_days: i64) -> Result<u64>;
}

pub struct PgStagingStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgStagingStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl<'a> StagingStore for PgStagingStore<'a> {
    async fn insert_rows(&self, job_id: &JobId, rows: &[NewStagingRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for row in rows {
            let id = mfg_ids::StagingRowId::new();
            sqlx::query(
                r#"INSERT INTO staging_rows (id, job_id, file_id, row_index, parsed_json)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(id.as_str())
            .bind(job_id.as_str())
            .bind(row.file_id.as_str())
            .bind(row.row_index)
            .bind(&row.parsed_json)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_row_errors(&self, row_id: &str, errors: Option<Value>) -> Result<()> {
        sqlx::query("UPDATE staging_rows SET errors_json = $1 WHERE id = $2")
            .bind(errors)
            .bind(row_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn list_rows(&self, job_id: &JobId, offset: i64, limit: i64) -> Result<Vec<StagingRowRecord>> {
        let rows = sqlx::query_as::<_, StagingRowRecord>(
            r#"SELECT id, job_id, file_id, row_index, parsed_json, errors_json
               FROM staging_rows WHERE job_id = $1
               ORDER BY row_index OFFSET $2 LIMIT $3"#,
        )
        .bind(job_id.as_str())
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_error_rows(
        &self,
        job_id: &JobId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<StagingRowRecord>> {
        let rows = sqlx::query_as::<_, StagingRowRecord>(
            r#"SELECT id, job_id, file_id, row_index, parsed_json, errors_json
               FROM staging_rows
               WHERE job_id = $1 AND errors_json IS NOT NULL
               ORDER BY row_index OFFSET $2 LIMIT $3"#,
        )
        .bind(job_id.as_str())
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_error_rows(&self, job_id: &JobId) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM staging_rows WHERE job_id = $1 AND errors_json IS NOT NULL",
        )
        .bind(job_id.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    async fn append_row_edit(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        record_id: &str,
        before_json: Value,
        after_json: Value,
        reason_id: i16,
        actor_id: &str,
    ) -> Result<RowEditRecord> {
        let id = RowEditId::new();
        let row = sqlx::query_as::<_, RowEditRecord>(
            r#"INSERT INTO row_edits (id, tenant_id, table_code, record_id, before_json, after_json, reason_id, actor_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING id, tenant_id, table_code, record_id, before_json, after_json, reason_id, actor_id, created_at"#,
        )
        .bind(id.as_str())
        .bind(tenant_id.as_str())
        .bind(table_code.as_str())
        .bind(record_id)
        .bind(before_json)
        .bind(after_json)
        .bind(reason_id)
        .bind(actor_id)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    async fn purge_expired(&self, retention_days: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"DELETE FROM staging_rows
               WHERE job_id IN (
                   SELECT id FROM import_jobs
                   WHERE status IN ('COMPLETED', 'FAILED', 'CANCELLED')
                     AND updated_at < now() - make_interval(days => $1)
               )"#,
        )
        .bind(retention_days as i32)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
