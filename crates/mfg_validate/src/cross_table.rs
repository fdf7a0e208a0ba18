//! Layer 4: cross-table (against-DB) referential checks.
//!
//! Advisory only — the validator may see stale state under concurrent
//! writers. The DB's own unique/foreign-key constraints are the
//! authority; the commit stage is what turns a real conflict into
//! `E_UNIQUE_IN_DB`. This layer exists so obviously-orphaned rows are
//! caught before a job reaches READY, not to guarantee correctness.

use mfg_db::RecordStore;
use mfg_ids::TenantId;
use mfg_schema::SchemaViolation;

/// Per-tenant toggle for whether layer 4 runs at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossTableSettings {
    pub check_p2_against_p1: bool,
    pub check_p3_against_p2: bool,
}

/// Verify a P2 row's lot has a matching P1 record. Terminates (returns
/// at most one violation) rather than compounding further checks for a
/// row once its parent is known missing.
pub async fn check_p2_parent(
    store: &impl RecordStore,
    tenant_id: &TenantId,
    lot_no_norm: i64,
) -> Option<SchemaViolation> {
    match store.find_p1_by_lots(tenant_id, &[lot_no_norm]).await {
        Ok(found) if found.is_empty() => Some(fk_missing("lot_no", "P1")),
        Ok(_) => None,
        Err(_) => None,
    }
}

/// Verify a P3 item's lot has a matching P2 record.
pub async fn check_p3_parent(
    store: &impl RecordStore,
    tenant_id: &TenantId,
    lot_no_norm: i64,
) -> Option<SchemaViolation> {
    match store.find_p2_by_lots(tenant_id, &[lot_no_norm]).await {
        Ok(found) if found.is_empty() => Some(fk_missing("lot_no", "P2")),
        Ok(_) => None,
        Err(_) => None,
    }
}

fn fk_missing(field: &str, parent_table: &str) -> SchemaViolation {
    SchemaViolation {
        field: field.to_string(),
        error_code: "E_FK_MISSING".to_string(),
        message: format!("no matching {parent_table} record for this lot"),
        value: None,
    }
}
