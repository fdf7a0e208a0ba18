//! Distinct-value enumerations for search-form dropdowns: tenant-scoped,
//! capped, lexicographically sorted.

use mfg_db::{EnumerableColumn, MfgDb, SearchStore};
use mfg_ids::TenantId;

use crate::error::Result;

pub const OPTIONS_CAP: i64 = 1000;

pub async fn options(
    db: &MfgDb,
    tenant_id: &TenantId,
    column: EnumerableColumn,
) -> Result<Vec<String>> {
    let values = db
        .search()
        .distinct_values(tenant_id, column, OPTIONS_CAP)
        .await?;
    Ok(values.into_iter().map(|v| v.value).collect())
}
