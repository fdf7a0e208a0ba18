//! Import job and import file persistence: the state-machine row the
//! ingestion pipeline drives through UPLOADED -> ... -> COMPLETED/FAILED.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mfg_ids::{ImportFileId, JobId, SchemaVersionId, TenantId};
use mfg_protocol::TableCode;
use serde_json::Value;
use sqlx::PgPool;

use crate::error::{DbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Uploaded,
    Parsing,
    Validating,
    Ready,
    Committing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_pre_committing(&self) -> bool {
        matches!(
            self,
            JobStatus::Uploaded | JobStatus::Parsing | JobStatus::Validating | JobStatus::Ready
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "UPLOADED",
            JobStatus::Parsing => "PARSING",
            JobStatus::Validating => "VALIDATING",
            JobStatus::Ready => "READY",
            JobStatus::Committing => "COMMITTING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportJobRow {
    pub id: String,
    pub tenant_id: String,
    pub table_code: String,
    pub status: String,
    pub total_rows: i32,
    pub error_count: i32,
    pub progress: i16,
    pub header_fingerprint: Option<String>,
    pub schema_version_id: Option<String>,
    pub error_summary: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJobRow {
    pub fn status(&self) -> JobStatus {
        match self.status.as_str() {
            "UPLOADED" => JobStatus::Uploaded,
            "PARSING" => JobStatus::Parsing,
            "VALIDATING" => JobStatus::Validating,
            "READY" => JobStatus::Ready,
            "COMMITTING" => JobStatus::Committing,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            "CANCELLED" => JobStatus::Cancelled,
            other => unreachable!("unknown job status persisted: {other}"),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportFileRow {
    pub id: String,
    pub job_id: String,
    pub filename: String,
    pub sha256: String,
    pub size_bytes: i64,
    pub blob_ref: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, tenant_id: &TenantId, table_code: TableCode) -> Result<ImportJobRow>;
    async fn get_job(&self, id: &JobId) -> Result<ImportJobRow>;

    async fn add_file(
        &self,
        job_id: &JobId,
        filename: &str,
        sha256: &str,
        size_bytes: i64,
        blob_ref: &str,
    ) -> Result<ImportFileRow>;
    async fn list_files(&self, job_id: &JobId) -> Result<Vec<ImportFileRow>>;

    /// Whether this tenant has already committed a file with this hash
    /// under this table code (used for `E_FILE_DUPLICATE`).
    async fn has_committed_duplicate(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        sha256: &str,
    ) -> Result<bool>;

    async fn set_header_fingerprint(
        &self,
        job_id: &JobId,
        fingerprint: &str,
        schema_version_id: &SchemaVersionId,
    ) -> Result<()>;

    async fn set_status(&self, job_id: &JobId, status: JobStatus, progress: i16) -> Result<()>;
    async fn set_failed(&self, job_id: &JobId, error_summary: Value) -> Result<()>;
    async fn set_total_rows(&self, job_id: &JobId, total_rows: i32) -> Result<()>;
    async fn set_error_count(&self, job_id: &JobId, error_count: i32) -> Result<()>;

    /// Cancel the job iff it is still in a pre-COMMITTING state. Returns
    /// `true` if the cancellation was applied.
    async fn cancel_if_pending(&self, job_id: &JobId) -> Result<bool>;
}

pub struct PgJobStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgJobStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl<'a> JobStore for PgJobStore<'a> {
    async fn create_job(&self, tenant_id: &TenantId, table_code: TableCode) -> Result<ImportJobRow> {
        let id = JobId::new();
        let row = sqlx::query_as::<_, ImportJobRow>(
            r#"INSERT INTO import_jobs (id, tenant_id, table_code, status, total_rows, error_count, progress)
               VALUES ($1, $2, $3, 'UPLOADED', 0, 0, 0)
               RETURNING *"#,
        )
        .bind(id.as_str())
        .bind(tenant_id.as_str())
        .bind(table_code.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    async fn get_job(&self, id: &JobId) -> Result<ImportJobRow> {
        sqlx::query_as::<_, ImportJobRow>("SELECT * FROM import_jobs WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(format!("import job {}", id)))
    }

    async fn add_file(
        &self,
        job_id: &JobId,
        filename: &str,
        sha256: &str,
        size_bytes: i64,
        blob_ref: &str,
    ) -> Result<ImportFileRow> {
        let id = ImportFileId::new();
        let row = sqlx::query_as::<_, ImportFileRow>(
            r#"INSERT INTO import_files (id, job_id, filename, sha256, size_bytes, blob_ref)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING *"#,
        )
        .bind(id.as_str())
        .bind(job_id.as_str())
        .bind(filename)
        .bind(sha256)
        .bind(size_bytes)
        .bind(blob_ref)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    async fn list_files(&self, job_id: &JobId) -> Result<Vec<ImportFileRow>> {
        let rows = sqlx::query_as::<_, ImportFileRow>(
            "SELECT * FROM import_files WHERE job_id = $1 ORDER BY created_at",
        )
        .bind(job_id.as_str())
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn has_committed_duplicate(
        &self,
        tenant_id: &TenantId,
        table_code: TableCode,
        sha256: &str,
    ) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM import_files f
               JOIN import_jobs j ON j.id = f.job_id
               WHERE j.tenant_id = $1 AND j.table_code = $2 AND f.sha256 = $3 AND j.status = 'COMPLETED'"#,
        )
        .bind(tenant_id.as_str())
        .bind(table_code.as_str())
        .bind(sha256)
        .fetch_one(self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn set_header_fingerprint(
        &self,
        job_id: &JobId,
        fingerprint: &str,
        schema_version_id: &SchemaVersionId,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE import_jobs SET header_fingerprint = $1, schema_version_id = $2, updated_at = now() WHERE id = $3",
        )
        .bind(fingerprint)
        .bind(schema_version_id.as_str())
        .bind(job_id.as_str())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn set_status(&self, job_id: &JobId, status: JobStatus, progress: i16) -> Result<()> {
        sqlx::query("UPDATE import_jobs SET status = $1, progress = $2, updated_at = now() WHERE id = $3")
            .bind(status.as_str())
            .bind(progress)
            .bind(job_id.as_str())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn set_failed(&self, job_id: &JobId, error_summary: Value) -> Result<()> {
        sqlx::query(
            "UPDATE import_jobs SET status = 'FAILED', error_summary = $1, updated_at = now() WHERE id = $2",
        )
        .bind(error_summary)
        .bind(job_id.as_str())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn set_total_rows(&self, job_id: &JobId, total_rows: i32) -> Result<()> {
        sqlx::query("UPDATE import_jobs SET total_rows = $1, updated_at = now() WHERE id = $2")
            .bind(total_rows)
            .bind(job_id.as_str())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn set_error_count(&self, job_id: &JobId, error_count: i32) -> Result<()> {
        sqlx::query("UPDATE import_jobs SET error_count = $1, updated_at = now() WHERE id = $2")
            .bind(error_count)
            .bind(job_id.as_str())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn cancel_if_pending(&self, job_id: &JobId) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE import_jobs SET status = 'CANCELLED', updated_at = now()
               WHERE id = $1 AND status IN ('UPLOADED', 'PARSING', 'VALIDATING', 'READY')"#,
        )
        .bind(job_id.as_str())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
