//! Trace detail: resolves an opaque `trace_key` back to the lineage
//! bundle a search result pointed at. A missing parent is `None`/`[]`,
//! never an error.

use mfg_db::{MfgDb, P1Row, P2ItemRow, P3ItemRow, RecordStore};
use mfg_ids::TenantId;

use crate::error::Result;
use crate::trace_key::decode_trace_key;

#[derive(Debug, Clone, Default)]
pub struct TraceDetail {
    pub p1: Option<P1Row>,
    pub p2_items: Vec<P2ItemRow>,
    pub p3_items: Vec<P3ItemRow>,
}

pub async fn trace(db: &MfgDb, tenant_id: &TenantId, trace_key: &str) -> Result<TraceDetail> {
    let lot_no_norm = decode_trace_key(tenant_id, trace_key)?;
    let bundle = db.records().find_by_lot(tenant_id, lot_no_norm).await?;

    Ok(TraceDetail {
        p1: bundle.p1,
        p2_items: bundle.p2_items,
        p3_items: bundle.p3_items,
    })
}
