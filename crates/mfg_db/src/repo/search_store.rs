//! Cross-table search for the query surface. P1/P2/P3 have genuinely
//! different columns, so each table is queried with its own dynamic
//! `QueryBuilder` and the results are unified into one envelope here;
//! `mfg_query` composes the P2 winder-merge and pagination on top.

use async_trait::async_trait;
use chrono::NaiveDate;
use mfg_ids::TenantId;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};

use mfg_protocol::TableCode;

use crate::error::Result;

/// Filters accepted by `search`. Every field is optional; an unset
/// filter does not narrow the result set.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
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

/// One search hit, already flattened to a table-agnostic shape.
/// `additional_data` carries whatever the owning table contributes
/// beyond the common fields (winder measurements, inspection fields).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchHit {
    pub data_type: String,
    pub record_id: String,
    pub item_id: Option<String>,
    pub lot_no_raw: String,
    pub lot_no_norm: i64,
    pub production_date: NaiveDate,
    pub winder_number: Option<i32>,
    pub additional_data: Value,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DistinctValue {
    pub value: String,
}

#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Search P1 lots. `filters.lot_no`, if set, is matched as a
    /// substring against the lot's normalized digit string.
    async fn search_p1(
        &self,
        tenant_id: &TenantId,
        filters: &SearchFilters,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SearchHit>, i64)>;

    /// Search P2 winders. One row per winder; callers wanting the
    /// merged-lot presentation do that above this layer.
    async fn search_p2(
        &self,
        tenant_id: &TenantId,
        filters: &SearchFilters,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SearchHit>, i64)>;

    /// Search P3 inspection rows.
    async fn search_p3(
        &self,
        tenant_id: &TenantId,
        filters: &SearchFilters,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SearchHit>, i64)>;

    /// Distinct values for one of the enumerable P2/P3 columns,
    /// tenant-scoped, capped and sorted by the caller.
    async fn distinct_values(
        &self,
        tenant_id: &TenantId,
        column: EnumerableColumn,
        cap: i64,
    ) -> Result<Vec<DistinctValue>>;
}

/// The columns the options-enumeration endpoint may ask for. A closed
/// set rather than a raw column name, so nothing outside this file
/// decides what's interpolated into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerableColumn {
    MachineNo,
    MoldNo,
    Specification,
    WinderNumber,
    BottomTapeLot,
}

impl EnumerableColumn {
    fn table(self) -> &'static str {
        match self {
            EnumerableColumn::MachineNo
            | EnumerableColumn::MoldNo
            | EnumerableColumn::Specification
            | EnumerableColumn::BottomTapeLot => "p3_items",
            EnumerableColumn::WinderNumber => "p2_items",
        }
    }

    fn column(self) -> &'static str {
        match self {
            EnumerableColumn::MachineNo => "machine_no",
            EnumerableColumn::MoldNo => "mold_no",
            EnumerableColumn::Specification => "specification",
            EnumerableColumn::BottomTapeLot => "bottom_tape_lot",
            EnumerableColumn::WinderNumber => "winder_number",
        }
    }
}

pub struct PgSearchStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgSearchStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    fn push_common_filters<'q>(
        builder: &mut QueryBuilder<'q, Postgres>,
        tenant_id: &'q TenantId,
        filters: &'q SearchFilters,
        alias: &str,
    ) {
        builder.push(" WHERE ");
        builder.push(alias).push(".tenant_id = ");
        builder.push_bind(tenant_id.as_str());

        if let Some(lot_no) = filters.lot_no.as_deref().filter(|s| !s.is_empty()) {
            let digits: String = lot_no.chars().filter(|c| c.is_ascii_digit()).collect();
            let pattern = format!("%{}%", if digits.is_empty() { lot_no } else { &digits });
            builder.push(" AND ");
            builder.push(alias).push(".lot_no_norm::text LIKE ");
            builder.push_bind(pattern);
        }
        if let Some(from) = filters.production_date_from {
            builder.push(" AND ");
            builder.push(alias).push(".production_date >= ");
            builder.push_bind(from);
        }
        if let Some(to) = filters.production_date_to {
            builder.push(" AND ");
            builder.push(alias).push(".production_date <= ");
            builder.push_bind(to);
        }
    }
}

#[async_trait]
impl<'a> SearchStore for PgSearchStore<'a> {
    async fn search_p1(
        &self,
        tenant_id: &TenantId,
        filters: &SearchFilters,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SearchHit>, i64)> {
        if matches!(filters.data_type, Some(dt) if dt != TableCode::P1) {
            return Ok((Vec::new(), 0));
        }

        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT count(*) FROM p1_records p");
        Self::push_common_filters(&mut count_builder, tenant_id, filters, "p");
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"SELECT 'P1' AS data_type, p.id AS record_id, NULL::text AS item_id,
                      p.lot_no_raw, p.lot_no_norm, p.production_date,
                      NULL::int AS winder_number, p.extras AS additional_data
               FROM p1_records p"#,
        );
        Self::push_common_filters(&mut builder, tenant_id, filters, "p");
        builder.push(" ORDER BY p.production_date DESC, p.lot_no_norm DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let hits: Vec<SearchHit> = builder.build_query_as().fetch_all(self.pool).await?;
        Ok((hits, total))
    }

    async fn search_p2(
        &self,
        tenant_id: &TenantId,
        filters: &SearchFilters,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SearchHit>, i64)> {
        if matches!(filters.data_type, Some(dt) if dt != TableCode::P2) {
            return Ok((Vec::new(), 0));
        }

        let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT count(*) FROM p2_records p JOIN p2_items i ON i.p2_record_id = p.id",
        );
        Self::push_common_filters(&mut count_builder, tenant_id, filters, "p");
        if let Some(winder) = filters.winder_number {
            count_builder.push(" AND i.winder_number = ");
            count_builder.push_bind(winder);
        }
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"SELECT 'P2' AS data_type, p.id AS record_id, i.id AS item_id,
                      p.lot_no_raw, p.lot_no_norm, p.production_date,
                      i.winder_number,
                      jsonb_build_object(
                          'sheet_width', i.sheet_width,
                          'appearance', i.appearance,
                          'rough_edge', i.rough_edge,
                          'slitting_result', i.slitting_result,
                          'row_data', i.row_data
                      ) AS additional_data
               FROM p2_records p JOIN p2_items i ON i.p2_record_id = p.id"#,
        );
        Self::push_common_filters(&mut builder, tenant_id, filters, "p");
        if let Some(winder) = filters.winder_number {
            builder.push(" AND i.winder_number = ");
            builder.push_bind(winder);
        }
        builder.push(" ORDER BY p.production_date DESC, p.lot_no_norm DESC, i.winder_number LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let hits: Vec<SearchHit> = builder.build_query_as().fetch_all(self.pool).await?;
        Ok((hits, total))
    }

    async fn search_p3(
        &self,
        tenant_id: &TenantId,
        filters: &SearchFilters,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SearchHit>, i64)> {
        if matches!(filters.data_type, Some(dt) if dt != TableCode::P3) {
            return Ok((Vec::new(), 0));
        }

        let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT count(*) FROM p3_records p JOIN p3_items i ON i.p3_record_id = p.id",
        );
        Self::push_common_filters(&mut count_builder, tenant_id, filters, "p");
        Self::push_p3_item_filters(&mut count_builder, filters);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"SELECT 'P3' AS data_type, p.id AS record_id, i.id AS item_id,
                      p.lot_no_raw, p.lot_no_norm, p.production_date,
                      i.source_winder AS winder_number,
                      jsonb_build_object(
                          'product_id', i.product_id,
                          'machine_no', i.machine_no,
                          'mold_no', i.mold_no,
                          'production_lot', i.production_lot,
                          'specification', i.specification,
                          'bottom_tape_lot', i.bottom_tape_lot,
                          'adjustment_record', i.adjustment_record,
                          'row_data', i.row_data
                      ) AS additional_data
               FROM p3_records p JOIN p3_items i ON i.p3_record_id = p.id"#,
        );
        Self::push_common_filters(&mut builder, tenant_id, filters, "p");
        Self::push_p3_item_filters(&mut builder, filters);
        builder.push(" ORDER BY p.production_date DESC, p.lot_no_norm DESC, i.row_no LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let hits: Vec<SearchHit> = builder.build_query_as().fetch_all(self.pool).await?;
        Ok((hits, total))
    }

    async fn distinct_values(
        &self,
        tenant_id: &TenantId,
        column: EnumerableColumn,
        cap: i64,
    ) -> Result<Vec<DistinctValue>> {
        let sql = format!(
            r#"SELECT DISTINCT {col}::text AS value FROM {table}
               WHERE tenant_id = $1 AND {col} IS NOT NULL
               ORDER BY value LIMIT $2"#,
            table = column.table(),
            col = column.column(),
        );
        let rows: Vec<DistinctValue> = sqlx::query_as(&sql)
            .bind(tenant_id.as_str())
            .bind(cap)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }
}

impl<'a> PgSearchStore<'a> {
    fn push_p3_item_filters<'q>(builder: &mut QueryBuilder<'q, Postgres>, filters: &'q SearchFilters) {
        if let Some(machine_no) = filters.machine_no.as_deref().filter(|s| !s.is_empty()) {
            builder.push(" AND i.machine_no = ");
            builder.push_bind(machine_no);
        }
        if let Some(mold_no) = filters.mold_no.as_deref().filter(|s| !s.is_empty()) {
            builder.push(" AND i.mold_no = ");
            builder.push_bind(mold_no);
        }
        if let Some(specification) = filters.specification.as_deref().filter(|s| !s.is_empty()) {
            builder.push(" AND i.specification = ");
            builder.push_bind(specification);
        }
        if let Some(bottom_tape_lot) = filters.bottom_tape_lot.as_deref().filter(|s| !s.is_empty()) {
            builder.push(" AND i.bottom_tape_lot = ");
            builder.push_bind(bottom_tape_lot);
        }
        if let Some(product_id) = filters.product_id.as_deref().filter(|s| !s.is_empty()) {
            builder.push(" AND i.product_id LIKE ");
            builder.push_bind(format!("%{}%", product_id));
        }
        if let Some(winder) = filters.winder_number {
            builder.push(" AND i.source_winder = ");
            builder.push_bind(winder);
        }
    }
}
