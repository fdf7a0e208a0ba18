//! `PipelineRunner`: the single entry point the HTTP/CLI layer calls
//! into. Owns the DB facade and schema registry and spawns one
//! `tokio::task` per in-flight job from `create_job`, rather than
//! polling a queue table — jobs are independent by construction, which
//! matches the reference repo's one-task-per-connection model more
//! closely than a fixed worker pool would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mfg_db::{ImportJobRow, JobStatus, JobStore, MfgDb, StagingStore};
use mfg_ids::{ImportFileId, JobId, SchemaVersionId, TenantId};
use mfg_protocol::TableCode;
use mfg_schema::SchemaRegistry;
use mfg_validate::CrossTableSettings;
use serde_json::{json, Value};

use crate::cancel::CancellationToken;
use crate::error::{PipelineError, Result};
use crate::stages::{self, StagedFile};
use crate::upload::{CreateJobOptions, UploadFile};

/// One entry of `list_errors`, flattened out of a staging row's
/// `errors_json`.
pub struct ErrorEntry {
    pub row_index: i64,
    pub field: String,
    pub error_code: String,
    pub message: String,
}

pub struct PipelineRunner {
    db: MfgDb,
    registry: Arc<SchemaRegistry>,
    cross_table: CrossTableSettings,
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl PipelineRunner {
    pub fn new(db: MfgDb, registry: Arc<SchemaRegistry>, cross_table: CrossTableSettings) -> Self {
        Self {
            db,
            registry,
            cross_table,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create_job(
        &self,
        tenant_id: TenantId,
        table_code: TableCode,
        files: Vec<UploadFile>,
        opts: CreateJobOptions,
    ) -> Result<ImportJobRow> {
        let job = self.db.jobs().create_job(&tenant_id, table_code).await?;
        let job_id = JobId::parse(&job.id).expect("db-issued id is always a valid uuid");

        if files.is_empty() {
            self.fail(&job_id, PipelineError::InvalidState, "create").await?;
            return self.reload(&job_id).await;
        }

        let format = match files[0].format() {
            Ok(f) => f,
            Err(e) => {
                self.fail(&job_id, PipelineError::Parse(e), "create").await?;
                return self.reload(&job_id).await;
            }
        };
        for file in &files {
            match file.format() {
                Ok(f) if f == format => {}
                _ => {
                    self.fail(&job_id, PipelineError::BatchMixedFormat, "create").await?;
                    return self.reload(&job_id).await;
                }
            }
        }

        let mut headers = Vec::with_capacity(files.len());
        for file in &files {
            match mfg_parser::read_header(format, &file.bytes) {
                Ok(h) => headers.push(h),
                Err(e) => {
                    self.fail(&job_id, PipelineError::Parse(e), "create").await?;
                    return self.reload(&job_id).await;
                }
            }
        }
        if headers.iter().any(|h| h != &headers[0]) {
            self.fail(&job_id, PipelineError::BatchMixedSchema, "create").await?;
            return self.reload(&job_id).await;
        }

        let header_refs: Vec<&str> = headers[0].iter().map(String::as_str).collect();
        let schema_version = match self.registry.resolve(&tenant_id, table_code, &header_refs).await {
            Ok(v) => v,
            Err(_) => {
                self.fail(&job_id, PipelineError::HeaderMismatch, "create").await?;
                return self.reload(&job_id).await;
            }
        };

        let mut staged = Vec::with_capacity(files.len());
        for file in files {
            let (sha256, size_bytes) = mfg_parser::hash::sha256_streaming(file.bytes.as_slice())?;
            let duplicate = self
                .db
                .jobs()
                .has_committed_duplicate(&tenant_id, table_code, &sha256)
                .await?;
            if duplicate && !opts.allow_duplicate {
                self.fail(&job_id, PipelineError::FileDuplicate, "create").await?;
                return self.reload(&job_id).await;
            }

            let blob_ref = format!("{job_id}/{}", file.filename);
            let file_row = self
                .db
                .jobs()
                .add_file(&job_id, &file.filename, &sha256, size_bytes as i64, &blob_ref)
                .await?;
            let file_id = ImportFileId::parse(&file_row.id).expect("db-issued id is always a valid uuid");
            staged.push(StagedFile {
                file_id,
                format,
                bytes: file.bytes,
            });
        }

        self.db
            .jobs()
            .set_header_fingerprint(&job_id, &schema_version.header_fingerprint, &schema_version.id)
            .await?;
        self.db.jobs().set_status(&job_id, JobStatus::Parsing, 0).await?;

        let token = CancellationToken::new();
        self.tokens
            .lock()
            .expect("token map lock poisoned")
            .insert(job_id.as_str().to_string(), token.clone());

        let db = self.db.clone();
        let cross_table = self.cross_table;
        let run_tenant_id = tenant_id.clone();
        let run_job_id = job_id.clone();
        tokio::spawn(async move {
            stages::run_parse_and_validate(
                &db,
                &run_job_id,
                &run_tenant_id,
                table_code,
                staged,
                &schema_version,
                cross_table,
                &token,
            )
            .await;
        });

        self.reload(&job_id).await
    }

    pub async fn get_job(&self, job_id: &JobId) -> Result<ImportJobRow> {
        Ok(self.db.jobs().get_job(job_id).await?)
    }

    pub async fn list_errors(&self, job_id: &JobId, offset: i64, limit: i64) -> Result<Vec<ErrorEntry>> {
        let rows = self.db.staging().list_error_rows(job_id, offset, limit).await?;
        let mut out = Vec::new();
        for row in rows {
            let Some(Value::Array(items)) = row.errors_json else {
                continue;
            };
            for item in items {
                let violation: mfg_schema::SchemaViolation =
                    serde_json::from_value(item).map_err(|_| PipelineError::InvalidState)?;
                out.push(ErrorEntry {
                    row_index: row.row_index,
                    field: violation.field,
                    error_code: violation.error_code,
                    message: violation.message,
                });
            }
        }
        Ok(out)
    }

    /// Allowed when the job is still pre-COMMITTING. Returns whether the
    /// cancellation was applied (it is a no-op past that point).
    pub async fn cancel(&self, job_id: &JobId) -> Result<bool> {
        let applied = self.db.jobs().cancel_if_pending(job_id).await?;
        if applied {
            if let Some(token) = self.tokens.lock().expect("token map lock poisoned").get(job_id.as_str()) {
                token.cancel();
            }
        }
        Ok(applied)
    }

    /// READY -> COMMITTING -> COMPLETED/FAILED. Idempotent: calling
    /// again on a COMPLETED or FAILED job returns the existing result
    /// without redoing any work.
    pub async fn commit(&self, job_id: &JobId) -> Result<ImportJobRow> {
        let job = self.db.jobs().get_job(job_id).await?;
        match job.status() {
            JobStatus::Completed | JobStatus::Failed => return Ok(job),
            JobStatus::Ready if job.error_count == 0 => {}
            JobStatus::Ready => return Err(PipelineError::InvalidState),
            _ => return Err(PipelineError::InvalidState),
        }

        let tenant_id = TenantId::parse(&job.tenant_id).expect("db-issued id is always a valid uuid");
        let table_code: TableCode = job.table_code.parse().expect("db only ever stores a valid table code");
        let schema_version_id = job.schema_version_id.as_deref().ok_or(PipelineError::InvalidState)?;
        let schema_version_id = SchemaVersionId::parse(schema_version_id).expect("db-issued id is always a valid uuid");
        let schema_version = self.registry.get(&schema_version_id).await?;

        self.db.jobs().set_status(job_id, JobStatus::Committing, 0).await?;
        let _ = stages::run_committing(&self.db, job_id, &tenant_id, table_code, &schema_version).await;
        Ok(self.db.jobs().get_job(job_id).await?)
    }

    async fn fail(&self, job_id: &JobId, err: PipelineError, stage: &str) -> Result<()> {
        self.db
            .jobs()
            .set_failed(
                job_id,
                json!({"stage": stage, "error_code": err.error_code().as_str(), "error": err.to_string()}),
            )
            .await?;
        Ok(())
    }

    async fn reload(&self, job_id: &JobId) -> Result<ImportJobRow> {
        Ok(self.db.jobs().get_job(job_id).await?)
    }
}
