//! The P3 → P2 → P1 join itself. Stateless: every call opens its own
//! maps, does its own batched fetches, and holds nothing between
//! requests.

use std::collections::HashMap;

use mfg_db::{MfgDb, P1Row, P2ItemRow, P2Row, P3ItemRow, RecordStore};
use mfg_ids::TenantId;
use mfg_schema::SchemaRegistry;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::columns::FlattenerColumnMap;
use crate::compression::Compression;
use crate::error::{Result, TraceError};

pub const MAX_PRODUCT_IDS: usize = 500;
pub const AUTO_GZIP_THRESHOLD: usize = 200;
pub const MAX_RECORDS_WARN: usize = 1500;
pub const MAX_RECORDS_HARD_CAP: usize = 3000;

/// The two ways a flatten request selects its P3 item population.
#[derive(Debug, Clone)]
pub enum FlattenQuery {
    ProductIds(Vec<String>),
    Month { year: i32, month: u32 },
}

/// A single flattened row, serialized as a JSON object in the
/// configured column order (a plain `serde_json::Map` does not
/// preserve insertion order without the `preserve_order` feature, so
/// this carries its own ordered pairs instead).
#[derive(Debug, Clone)]
pub struct FlatRow(Vec<(String, Value)>);

impl Serialize for FlatRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FlattenMetadata {
    pub query_type: &'static str,
    pub product_ids: Option<Vec<String>>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub compression: &'static str,
    pub null_handling: &'static str,
    pub empty_array_handling: &'static str,
}

#[derive(Debug, Clone)]
pub struct FlattenOutcome {
    pub data: Vec<FlatRow>,
    pub count: usize,
    pub has_data: bool,
    pub metadata: FlattenMetadata,
    pub compression: Compression,
}

pub async fn flatten(
    db: &MfgDb,
    registry: &SchemaRegistry,
    tenant_id: &TenantId,
    query: FlattenQuery,
) -> Result<FlattenOutcome> {
    validate_query(&query)?;

    let records = db.records();

    let mut items: Vec<P3ItemRow> = match &query {
        FlattenQuery::ProductIds(ids) => records.find_p3_items_by_product_ids(tenant_id, ids).await?,
        FlattenQuery::Month { year, month } => {
            records.find_p3_items_by_month(tenant_id, *year, *month).await?
        }
    };
    sort_by_date_then_product_id(&mut items);

    if items.len() > MAX_RECORDS_HARD_CAP {
        return Err(TraceError::ResultTooLarge {
            rows: items.len(),
            cap: MAX_RECORDS_HARD_CAP,
        });
    }

    let column_map = match registry.flatten_columns(tenant_id).await? {
        Some(value) => FlattenerColumnMap::from_json(value)?,
        None => FlattenerColumnMap::default_map(),
    };

    let lots: Vec<i64> = {
        let mut set: Vec<i64> = items
            .iter()
            .map(|item| {
                mfg_normalize::normalize_p3_lot_no(&item.lot_no)
                    .expect("persisted P3 items always carry an already-normalizable lot_no")
                    .norm
            })
            .collect();
        set.sort_unstable();
        set.dedup();
        set
    };

    let p2_rows = records.find_p2_by_lots(tenant_id, &lots).await?;
    let p2_map: HashMap<i64, P2Row> = p2_rows.into_iter().map(|p2| (p2.lot_no_norm, p2)).collect();

    let p2_ids: Vec<String> = p2_map.values().map(|p2| p2.id.clone()).collect();
    let p2_items = records.find_p2_items(tenant_id, &p2_ids).await?;
    let p2_item_map: HashMap<(String, i32), P2ItemRow> = p2_items
        .into_iter()
        .map(|item| ((item.p2_record_id.clone(), item.winder_number), item))
        .collect();

    let p1_rows = records.find_p1_by_lots(tenant_id, &lots).await?;
    let p1_map: HashMap<i64, P1Row> = p1_rows.into_iter().map(|p1| (p1.lot_no_norm, p1)).collect();

    let data: Vec<FlatRow> = items
        .iter()
        .map(|item| {
            let lot_no_norm = mfg_normalize::normalize_p3_lot_no(&item.lot_no)
                .expect("already validated above")
                .norm;
            build_row(item, lot_no_norm, &p1_map, &p2_map, &p2_item_map, &column_map)
        })
        .collect();

    let count = data.len();
    let compression = Compression::for_row_count(count, AUTO_GZIP_THRESHOLD, MAX_RECORDS_WARN);
    if compression == Compression::ForcedGzip {
        tracing::warn!(tenant_id = %tenant_id, count, "flatten result forced to gzip, client should paginate");
    }

    let (query_type, product_ids, year, month) = match &query {
        FlattenQuery::ProductIds(ids) => ("product_ids", Some(ids.clone()), None, None),
        FlattenQuery::Month { year, month } => ("month", None, Some(*year), Some(*month)),
    };

    Ok(FlattenOutcome {
        has_data: count > 0,
        count,
        data,
        metadata: FlattenMetadata {
            query_type,
            product_ids,
            year,
            month,
            compression: compression.as_str(),
            null_handling: "explicit",
            empty_array_handling: "preserve",
        },
        compression,
    })
}

fn build_row(
    item: &P3ItemRow,
    lot_no_norm: i64,
    p1_map: &HashMap<i64, P1Row>,
    p2_map: &HashMap<i64, P2Row>,
    p2_item_map: &HashMap<(String, i32), P2ItemRow>,
    column_map: &FlattenerColumnMap,
) -> FlatRow {
    let mut merged: HashMap<String, Value> = HashMap::new();

    if let Value::Object(obj) = &item.row_data {
        merged.extend(obj.clone());
    }
    merged.insert("p3_item_id".to_string(), Value::String(item.id.clone()));
    merged.insert("p3_record_id".to_string(), Value::String(item.p3_record_id.clone()));
    merged.insert("row_no".to_string(), Value::from(item.row_no));
    merged.insert("product_id".to_string(), opt_string(&item.product_id));
    merged.insert("lot_no".to_string(), Value::String(item.lot_no.clone()));
    merged.insert("production_date".to_string(), Value::String(item.production_date.to_string()));
    merged.insert("machine_no".to_string(), opt_string(&item.machine_no));
    merged.insert("mold_no".to_string(), opt_string(&item.mold_no));
    merged.insert("production_lot".to_string(), opt_string(&item.production_lot));
    merged.insert("source_winder".to_string(), opt_i32(item.source_winder));
    merged.insert("specification".to_string(), opt_string(&item.specification));
    merged.insert("bottom_tape_lot".to_string(), opt_string(&item.bottom_tape_lot));
    merged.insert(
        "adjustment_record".to_string(),
        item.adjustment_record.map(Value::from).unwrap_or(Value::Null),
    );

    if let Some(p1) = p1_map.get(&lot_no_norm) {
        if let Value::Object(obj) = &p1.extras {
            for (k, v) in obj {
                merged.insert(format!("p1_{k}"), v.clone());
            }
        }
        merged.insert("p1_id".to_string(), Value::String(p1.id.clone()));
        merged.insert("p1_lot_no_raw".to_string(), Value::String(p1.lot_no_raw.clone()));
        merged.insert("p1_lot_no_norm".to_string(), Value::from(p1.lot_no_norm));
        merged.insert("p1_production_date".to_string(), Value::String(p1.production_date.to_string()));
        merged.insert("p1_schema_version_id".to_string(), Value::String(p1.schema_version_id.clone()));
    }

    if let Some(p2) = p2_map.get(&lot_no_norm) {
        if let Value::Object(obj) = &p2.extras {
            for (k, v) in obj {
                merged.insert(format!("p2_{k}"), v.clone());
            }
        }
        merged.insert("p2_id".to_string(), Value::String(p2.id.clone()));
        merged.insert("p2_lot_no_raw".to_string(), Value::String(p2.lot_no_raw.clone()));
        merged.insert("p2_lot_no_norm".to_string(), Value::from(p2.lot_no_norm));
        merged.insert("p2_production_date".to_string(), Value::String(p2.production_date.to_string()));

        if let Some(winder) = item.source_winder {
            if let Some(p2_item) = p2_item_map.get(&(p2.id.clone(), winder)) {
                if let Value::Object(obj) = &p2_item.row_data {
                    for (k, v) in obj {
                        merged.insert(format!("p2_{k}"), v.clone());
                    }
                }
                merged.insert("p2_item_id".to_string(), Value::String(p2_item.id.clone()));
                merged.insert("p2_winder_number".to_string(), Value::from(p2_item.winder_number));
                merged.insert("p2_sheet_width".to_string(), opt_f64(p2_item.sheet_width));
                merged.insert("p2_appearance".to_string(), opt_string(&p2_item.appearance));
                merged.insert("p2_rough_edge".to_string(), opt_string(&p2_item.rough_edge));
                merged.insert("p2_slitting_result".to_string(), opt_string(&p2_item.slitting_result));
            }
        }
    }

    let pairs = column_map
        .columns()
        .iter()
        .map(|name| (name.clone(), merged.get(name).cloned().unwrap_or(Value::Null)))
        .collect();
    FlatRow(pairs)
}

fn opt_string(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    }
}

fn opt_i32(value: Option<i32>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn opt_f64(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Rejects what the DB layer can't: too many product ids, or a month
/// outside `1..=12` (the latter would otherwise panic inside
/// `NaiveDate::from_ymd_opt(..).expect(..)` in the record store).
fn validate_query(query: &FlattenQuery) -> Result<()> {
    match query {
        FlattenQuery::ProductIds(ids) if ids.len() > MAX_PRODUCT_IDS => Err(TraceError::TooManyProductIds {
            max: MAX_PRODUCT_IDS,
            got: ids.len(),
        }),
        FlattenQuery::Month { month, .. } if !(1..=12).contains(month) => {
            Err(TraceError::InvalidMonth(*month))
        }
        _ => Ok(()),
    }
}

/// `production_date ASC, product_id ASC NULLS LAST`. `Option<String>`'s
/// derived `Ord` puts `None` before every `Some`, the opposite of
/// Postgres's `NULLS LAST` default, so null-ness is compared explicitly
/// ahead of the value.
fn sort_by_date_then_product_id(items: &mut [P3ItemRow]) {
    items.sort_by(|a, b| {
        a.production_date
            .cmp(&b.production_date)
            .then_with(|| a.product_id.is_none().cmp(&b.product_id.is_none()))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(product_id: Option<&str>, date: &str) -> P3ItemRow {
        P3ItemRow {
            id: "id".to_string(),
            p3_record_id: "rec".to_string(),
            tenant_id: "tenant".to_string(),
            row_no: 0,
            product_id: product_id.map(str::to_string),
            lot_no: "1234567-89".to_string(),
            production_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            machine_no: None,
            mold_no: None,
            production_lot: None,
            source_winder: None,
            specification: None,
            bottom_tape_lot: None,
            adjustment_record: None,
            row_data: Value::Null,
        }
    }

    #[test]
    fn null_product_id_sorts_after_every_value_on_the_same_date() {
        let mut items = vec![
            item(None, "2024-01-01"),
            item(Some("P2"), "2024-01-01"),
            item(Some("P1"), "2024-01-01"),
        ];
        sort_by_date_then_product_id(&mut items);
        let ids: Vec<Option<&str>> = items.iter().map(|i| i.product_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("P1"), Some("P2"), None]);
    }

    #[test]
    fn date_takes_priority_over_product_id() {
        let mut items = vec![item(Some("Z"), "2024-02-01"), item(None, "2024-01-01")];
        sort_by_date_then_product_id(&mut items);
        assert_eq!(items[0].production_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn month_query_rejects_out_of_range_month_before_touching_the_db() {
        let err = validate_query(&FlattenQuery::Month { year: 2024, month: 13 }).unwrap_err();
        assert!(matches!(err, TraceError::InvalidMonth(13)));
    }

    #[test]
    fn month_query_accepts_the_full_valid_range() {
        for month in 1..=12 {
            assert!(validate_query(&FlattenQuery::Month { year: 2024, month }).is_ok());
        }
    }

    #[test]
    fn too_many_product_ids_is_still_rejected() {
        let ids = vec!["x".to_string(); MAX_PRODUCT_IDS + 1];
        let err = validate_query(&FlattenQuery::ProductIds(ids)).unwrap_err();
        assert!(matches!(err, TraceError::TooManyProductIds { .. }));
    }
}
