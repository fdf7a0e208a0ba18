//! Advanced search across P1/P2/P3. Each table has genuinely different
//! columns, so each is queried on its own and the results are unified
//! here into one tenant-scoped, paginated envelope.

use chrono::NaiveDate;
use serde_json::Value;

use mfg_db::{MfgDb, SearchFilters, SearchHit, SearchStore};
use mfg_ids::TenantId;
use mfg_protocol::{Pagination, TableCode};

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub data_type: Option<TableCode>,
    pub lot_no: Option<String>,
    pub production_date_from: Option<NaiveDate>,
    pub production_date_to: Option<NaiveDate>,
    pub machine_no: Option<String>,
    pub mold_no: Option<String>,
    pub specification: Option<String>,
    pub winder_number: Option<i32>,
    pub product_id: Option<String>,
    pub bottom_tape_lot: Option<String>,
}

impl From<SearchQuery> for SearchFilters {
    fn from(q: SearchQuery) -> Self {
        SearchFilters {
            data_type: q.data_type,
            lot_no: q.lot_no,
            production_date_from: q.production_date_from,
            production_date_to: q.production_date_to,
            machine_no: q.machine_no,
            mold_no: q.mold_no,
            specification: q.specification,
            winder_number: q.winder_number,
            product_id: q.product_id,
            bottom_tape_lot: q.bottom_tape_lot,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRecord {
    pub data_type: TableCode,
    pub record_id: String,
    pub lot_no_raw: String,
    pub lot_no_norm: i64,
    pub production_date: NaiveDate,
    pub winder_number: Option<i32>,
    pub additional_data: Value,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub records: Vec<SearchRecord>,
}

pub async fn search(
    db: &MfgDb,
    tenant_id: &TenantId,
    query: SearchQuery,
    pagination: Pagination,
) -> Result<SearchResult> {
    let data_type = query.data_type;
    let merge_winders = query.winder_number.is_none();
    let filters: SearchFilters = query.into();
    let store = db.search();

    let result = match data_type {
        Some(TableCode::P1) => {
            let (hits, total) = store
                .search_p1(tenant_id, &filters, pagination.limit(), pagination.offset())
                .await?;
            SearchResult {
                total,
                page: pagination.page,
                page_size: pagination.page_size,
                records: hits.into_iter().map(hit_to_record).collect(),
            }
        }
        Some(TableCode::P2) => {
            let (hits, total) = store
                .search_p2(tenant_id, &filters, pagination.limit(), pagination.offset())
                .await?;
            let records = if merge_winders { merge_p2_winders(hits) } else { hits.into_iter().map(hit_to_record).collect() };
            SearchResult {
                total,
                page: pagination.page,
                page_size: pagination.page_size,
                records,
            }
        }
        Some(TableCode::P3) => {
            let (hits, total) = store
                .search_p3(tenant_id, &filters, pagination.limit(), pagination.offset())
                .await?;
            SearchResult {
                total,
                page: pagination.page,
                page_size: pagination.page_size,
                records: hits.into_iter().map(hit_to_record).collect(),
            }
        }
        None => {
            let (p1_hits, p1_total) = store
                .search_p1(tenant_id, &filters, pagination.limit(), pagination.offset())
                .await?;
            let (p2_hits, p2_total) = store
                .search_p2(tenant_id, &filters, pagination.limit(), pagination.offset())
                .await?;
            let (p3_hits, p3_total) = store
                .search_p3(tenant_id, &filters, pagination.limit(), pagination.offset())
                .await?;

            let p2_records = if merge_winders { merge_p2_winders(p2_hits) } else { p2_hits.into_iter().map(hit_to_record).collect() };

            let mut records: Vec<SearchRecord> = p1_hits
                .into_iter()
                .map(hit_to_record)
                .chain(p2_records)
                .chain(p3_hits.into_iter().map(hit_to_record))
                .collect();
            records.sort_by(|a, b| b.production_date.cmp(&a.production_date));
            records.truncate(pagination.limit() as usize);

            SearchResult {
                // Each table's own count; the merge that reduces P2
                // winder rows to one-per-lot is presentation-only, so
                // the total still reflects stored rows, matching the
                // storage-stays-one-row-per-winder rule.
                total: p1_total + p2_total + p3_total,
                page: pagination.page,
                page_size: pagination.page_size,
                records,
            }
        }
    };

    Ok(result)
}

fn hit_to_record(hit: SearchHit) -> SearchRecord {
    SearchRecord {
        data_type: hit.data_type.parse().expect("search_store only emits P1/P2/P3"),
        record_id: hit.record_id,
        lot_no_raw: hit.lot_no_raw,
        lot_no_norm: hit.lot_no_norm,
        production_date: hit.production_date,
        winder_number: hit.winder_number,
        additional_data: hit.additional_data,
    }
}

/// Merge consecutive P2 hits sharing a `record_id` into one result with
/// `additional_data.rows`. `search_p2` orders by `(production_date,
/// lot_no_norm, winder_number)`, so a lot's winders are always
/// contiguous within a page.
fn merge_p2_winders(hits: Vec<SearchHit>) -> Vec<SearchRecord> {
    let mut merged: Vec<SearchRecord> = Vec::new();

    for hit in hits {
        let mut row = hit.additional_data.clone();
        if let Value::Object(obj) = &mut row {
            obj.insert("winder_number".to_string(), hit.winder_number.into());
        }

        match merged.last_mut() {
            Some(last) if last.record_id == hit.record_id => {
                if let Value::Object(obj) = &mut last.additional_data {
                    obj.get_mut("rows")
                        .and_then(Value::as_array_mut)
                        .expect("merged record always carries a rows array")
                        .push(row);
                }
            }
            _ => {
                let additional_data = serde_json::json!({ "rows": [row] });
                merged.push(SearchRecord {
                    data_type: TableCode::P2,
                    record_id: hit.record_id,
                    lot_no_raw: hit.lot_no_raw,
                    lot_no_norm: hit.lot_no_norm,
                    production_date: hit.production_date,
                    winder_number: None,
                    additional_data,
                });
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(record_id: &str, winder: i32) -> SearchHit {
        SearchHit {
            data_type: "P2".to_string(),
            record_id: record_id.to_string(),
            item_id: None,
            lot_no_raw: "1234567-89".to_string(),
            lot_no_norm: 123456789,
            production_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            winder_number: Some(winder),
            additional_data: serde_json::json!({ "sheet_width": 12.5 }),
        }
    }

    #[test]
    fn merges_contiguous_winders_of_one_lot() {
        let hits = vec![hit("lot-a", 1), hit("lot-a", 2), hit("lot-b", 1)];
        let merged = merge_p2_winders(hits);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].additional_data["rows"].as_array().unwrap().len(), 2);
        assert_eq!(merged[1].additional_data["rows"].as_array().unwrap().len(), 1);
    }
}
