//! The three background stages a job moves through: PARSING,
//! VALIDATING, COMMITTING. Each checks the job's [`CancellationToken`]
//! at chunk boundaries and stops without error if it's been cancelled —
//! the DB row itself was already moved to CANCELLED transactionally by
//! `cancel_if_pending`.

use std::collections::HashMap;

use mfg_db::{JobStore, MfgDb, NewStagingRow, RecordStore, StagingStore};
use mfg_ids::{ImportFileId, JobId, TenantId};
use mfg_protocol::TableCode;
use mfg_schema::SchemaVersion;
use mfg_validate::{coerce, cross_row, cross_table, validate_single_row, CrossTableSettings, ErrorSink, RawRow};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::cancel::CancellationToken;
use crate::commit;
use crate::error::{PipelineError, Result};

const CHUNK_SIZE: i64 = 500;

pub struct StagedFile {
    pub file_id: ImportFileId,
    pub format: mfg_parser::FileFormat,
    pub bytes: Vec<u8>,
}

/// Runs PARSING, then (if not cancelled and parsing succeeded)
/// VALIDATING, leaving the job at READY or FAILED. Committing is a
/// separate, explicitly-invoked stage since it is not automatic.
pub async fn run_parse_and_validate(
    db: &MfgDb,
    job_id: &JobId,
    tenant_id: &TenantId,
    table_code: TableCode,
    files: Vec<StagedFile>,
    schema_version: &SchemaVersion,
    cross_table_settings: CrossTableSettings,
    token: &CancellationToken,
) {
    let columns: Vec<String> = schema_version.columns.iter().map(|c| c.name.clone()).collect();

    match run_parsing(db, job_id, files, &columns, token).await {
        Ok(Some(total_rows)) => {
            info!(%job_id, total_rows, "parsing complete");
        }
        Ok(None) => {
            info!(%job_id, "parsing stopped: job cancelled");
            return;
        }
        Err(e) => {
            warn!(%job_id, error = %e, "parsing failed");
            let _ = db
                .jobs()
                .set_failed(job_id, json!({"stage": "parse", "error": e.to_string()}))
                .await;
            return;
        }
    }

    if token.is_cancelled() {
        return;
    }

    match run_validating(db, job_id, tenant_id, table_code, schema_version, cross_table_settings, token).await {
        Ok(Some(error_count)) => {
            info!(%job_id, error_count, "validation complete");
        }
        Ok(None) => {
            info!(%job_id, "validation stopped: job cancelled");
        }
        Err(e) => {
            warn!(%job_id, error = %e, "validation failed");
            let _ = db
                .jobs()
                .set_failed(job_id, json!({"stage": "validate", "error": e.to_string()}))
                .await;
        }
    }
}

async fn run_parsing(
    db: &MfgDb,
    job_id: &JobId,
    files: Vec<StagedFile>,
    columns: &[String],
    token: &CancellationToken,
) -> Result<Option<i64>> {
    let mut total_rows: i64 = 0;

    for file in files {
        if token.is_cancelled() {
            return Ok(None);
        }

        let parsed = mfg_parser::parse_bytes(file.format, &file.bytes, columns)?;

        for chunk in parsed.chunks(CHUNK_SIZE as usize) {
            if token.is_cancelled() {
                return Ok(None);
            }
            let rows: Vec<NewStagingRow> = chunk
                .iter()
                .map(|r| NewStagingRow {
                    file_id: file.file_id.clone(),
                    row_index: r.row_index,
                    parsed_json: r.parsed_json.clone(),
                })
                .collect();
            db.staging().insert_rows(job_id, &rows).await?;
            total_rows += rows.len() as i64;

            let chunks_seen = (total_rows / CHUNK_SIZE) + 1;
            let progress = (chunks_seen * 5).min(40) as i16;
            db.jobs().set_status(job_id, mfg_db::JobStatus::Parsing, progress).await?;
        }
    }

    db.jobs().set_total_rows(job_id, total_rows as i32).await?;
    Ok(Some(total_rows))
}

async fn run_validating(
    db: &MfgDb,
    job_id: &JobId,
    tenant_id: &TenantId,
    table_code: TableCode,
    schema_version: &SchemaVersion,
    cross_table_settings: CrossTableSettings,
    token: &CancellationToken,
) -> Result<Option<i64>> {
    db.jobs().set_status(job_id, mfg_db::JobStatus::Validating, 40).await?;

    let mut sink = ErrorSink::default();
    // Distinct lots seen, for the cross-table parent check (P2->P1, P3->P2).
    let mut lots: HashMap<i64, Vec<i64>> = HashMap::new();
    // (row_index, key) pairs for the cross-row uniqueness check: P2 keys
    // on (lot_no_norm, winder_number), P3 keys on product_id.
    let mut p2_keys: Vec<(usize, Option<(i64, i64)>)> = Vec::new();
    let mut p3_keys: Vec<(usize, Option<String>)> = Vec::new();
    let mut offset = 0i64;

    loop {
        if token.is_cancelled() {
            return Ok(None);
        }
        let rows = db.staging().list_rows(job_id, offset, CHUNK_SIZE).await?;
        if rows.is_empty() {
            break;
        }

        for row in &rows {
            let raw = json_object_to_raw_row(&row.parsed_json);
            let result = validate_single_row(table_code, &schema_version.columns, &raw);
            sink.extend(row.row_index as usize, result.errors);

            let lot_norm = match table_code {
                TableCode::P3 => raw.get("lot_no").and_then(|s| mfg_normalize::normalize_p3_lot_no(s).ok()),
                _ => raw.get("lot_no").and_then(|s| mfg_normalize::normalize_lot_no(s).ok()),
            }
            .map(|lot| lot.norm);

            match table_code {
                TableCode::P2 => {
                    let winder = result.values.get("winder_number").and_then(mfg_validate::CoercedValue::as_i64);
                    let key = lot_norm.zip(winder);
                    p2_keys.push((row.row_index as usize, key));
                    if let Some(norm) = lot_norm {
                        lots.entry(norm).or_default().push(row.row_index);
                    }
                }
                TableCode::P3 => {
                    let product_id = result
                        .values
                        .get("product_id")
                        .and_then(mfg_validate::CoercedValue::as_text)
                        .map(str::to_string);
                    p3_keys.push((row.row_index as usize, product_id));
                    if let Some(norm) = lot_norm {
                        lots.entry(norm).or_default().push(row.row_index);
                    }
                }
                TableCode::P1 => {}
            }
        }

        offset += rows.len() as i64;
        let chunks_seen = (offset / CHUNK_SIZE) + 1;
        let progress = 40 + (chunks_seen * 5).min(50) as i16;
        db.jobs().set_status(job_id, mfg_db::JobStatus::Validating, progress).await?;
    }

    // Layer 3: cross-row uniqueness within this batch.
    match table_code {
        TableCode::P2 => {
            for (row_index, violation) in cross_row::check_unique_in_file(&p2_keys, "winder_number") {
                sink.add(row_index, violation);
            }
        }
        TableCode::P3 => {
            for (row_index, violation) in cross_row::check_unique_in_file(&p3_keys, "product_id") {
                sink.add(row_index, violation);
            }
        }
        TableCode::P1 => {}
    }

    // Layer 4: cross-table, advisory.
    let run_cross_table = (cross_table_settings.check_p2_against_p1 && matches!(table_code, TableCode::P2))
        || (cross_table_settings.check_p3_against_p2 && matches!(table_code, TableCode::P3));
    if run_cross_table {
        let store = db.records();
        for (&lot_norm, occurrences) in &lots {
            let violation = match table_code {
                TableCode::P2 => cross_table::check_p2_parent(&store, tenant_id, lot_norm).await,
                TableCode::P3 => cross_table::check_p3_parent(&store, tenant_id, lot_norm).await,
                TableCode::P1 => None,
            };
            if let Some(v) = violation {
                for row_index in occurrences {
                    sink.add(*row_index as usize, v.clone());
                }
            }
        }
    }

    // Persist per-row error lists.
    let mut offset = 0i64;
    loop {
        let rows = db.staging().list_rows(job_id, offset, CHUNK_SIZE).await?;
        if rows.is_empty() {
            break;
        }
        for row in &rows {
            let errors = sink.by_row.get(&(row.row_index as usize));
            let errors_json = errors.map(|v| serde_json::to_value(v).expect("violations always serialize"));
            db.staging().set_row_errors(&row.id, errors_json).await?;
        }
        offset += rows.len() as i64;
    }

    let error_count = sink.error_count() as i32;
    db.jobs().set_error_count(job_id, error_count).await?;
    db.jobs().set_status(job_id, mfg_db::JobStatus::Ready, 100).await?;
    Ok(Some(error_count as i64))
}

/// Single DB transaction: bulk upsert by `lot_no_norm`, replacing P2/P3
/// items for each header. Unique-constraint violations are translated
/// into row-targeted failures rather than a generic internal error.
pub async fn run_committing(
    db: &MfgDb,
    job_id: &JobId,
    tenant_id: &TenantId,
    table_code: TableCode,
    schema_version: &SchemaVersion,
) -> Result<()> {
    let mut rows = Vec::new();
    let mut offset = 0i64;
    loop {
        let batch = db.staging().list_rows(job_id, offset, CHUNK_SIZE).await?;
        if batch.is_empty() {
            break;
        }
        for row in &batch {
            let raw = json_object_to_raw_row(&row.parsed_json);
            let (values, errors) = coerce::validate_row(&schema_version.columns, &raw);
            if !errors.is_empty() {
                return Err(PipelineError::InvalidState);
            }
            rows.push(commit::CommitRow {
                row_index: row.row_index,
                values,
                raw: row.parsed_json.clone(),
            });
        }
        offset += batch.len() as i64;
    }

    let pool = db.pool().clone();
    let mut tx = pool.begin().await.map_err(mfg_db::DbError::Sqlx)?;

    let result: Result<()> = async {
        match table_code {
            TableCode::P1 => {
                let records = db.records();
                for entry in commit::build_p1(&rows)? {
                    records
                        .upsert_p1(
                            &mut tx,
                            tenant_id,
                            &entry.lot.canonical,
                            entry.lot.norm,
                            entry.production_date,
                            &schema_version.id,
                            entry.extras,
                        )
                        .await?;
                }
            }
            TableCode::P2 => {
                let records = db.records();
                for entry in commit::build_p2(&rows)? {
                    let p2_id = records
                        .upsert_p2_header(
                            &mut tx,
                            tenant_id,
                            &entry.lot.canonical,
                            entry.lot.norm,
                            entry.production_date,
                            &schema_version.id,
                            entry.extras,
                        )
                        .await?;
                    records.replace_p2_items(&mut tx, &p2_id, tenant_id, entry.items).await?;
                }
            }
            TableCode::P3 => {
                let records = db.records();
                for entry in commit::build_p3(&rows)? {
                    let p3_id = records
                        .upsert_p3_header(&mut tx, tenant_id, &entry.lot.canonical, entry.lot.norm, entry.production_date, entry.extras)
                        .await?;
                    records.replace_p3_items(&mut tx, &p3_id, tenant_id, entry.items).await?;
                }
            }
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            tx.commit().await.map_err(mfg_db::DbError::Sqlx)?;
            db.jobs().set_status(job_id, mfg_db::JobStatus::Completed, 100).await?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback().await;
            let error_code = if is_unique_violation(&e) {
                mfg_protocol::ErrorCode::EUniqueInDb
            } else {
                e.error_code()
            };
            db.jobs()
                .set_failed(job_id, json!({"stage": "commit", "error_code": error_code.as_str()}))
                .await?;
            Err(e)
        }
    }
}

fn is_unique_violation(e: &PipelineError) -> bool {
    matches!(
        e,
        PipelineError::Db(mfg_db::DbError::Sqlx(sqlx::Error::Database(db_err))) if db_err.is_unique_violation()
    )
}

fn json_object_to_raw_row(value: &Value) -> RawRow {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
