//! P1/P2/P3 header + item persistence. Write methods take an open
//! transaction so the ingestion pipeline's commit stage can compose a
//! header upsert and its item replace into one atomic unit; read
//! methods go straight through the pool since they never need to be
//! composed with other writes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mfg_ids::{P1Id, P2Id, P2ItemId, P3Id, P3ItemId, SchemaVersionId, TenantId};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct P1Row {
    pub id: String,
    pub tenant_id: String,
    pub lot_no_raw: String,
    pub lot_no_norm: i64,
    pub production_date: NaiveDate,
    pub schema_version_id: String,
    pub extras: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct P2Row {
    pub id: String,
    pub tenant_id: String,
    pub lot_no_raw: String,
    pub lot_no_norm: i64,
    pub production_date: NaiveDate,
    pub schema_version_id: String,
    pub extras: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct P2ItemRow {
    pub id: String,
    pub p2_record_id: String,
    pub tenant_id: String,
    pub winder_number: i32,
    pub sheet_width: Option<f64>,
    pub appearance: Option<String>,
    pub rough_edge: Option<String>,
    pub slitting_result: Option<String>,
    pub row_data: Value,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct P3Row {
    pub id: String,
    pub tenant_id: String,
    pub lot_no_raw: String,
    pub lot_no_norm: i64,
    pub production_date: NaiveDate,
    pub extras: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct P3ItemRow {
    pub id: String,
    pub p3_record_id: String,
    pub tenant_id: String,
    pub row_no: i32,
    pub product_id: Option<String>,
    pub lot_no: String,
    pub production_date: NaiveDate,
    pub machine_no: Option<String>,
    pub mold_no: Option<String>,
    pub production_lot: Option<String>,
    pub source_winder: Option<i32>,
    pub specification: Option<String>,
    pub bottom_tape_lot: Option<String>,
    pub adjustment_record: Option<i16>,
    pub row_data: Value,
}

/// A single winder's worth of P2 measurements, ready for batched
/// replace-insert.
#[derive(Debug, Clone)]
pub struct P2ItemInput {
    pub winder_number: i32,
    pub sheet_width: Option<f64>,
    pub appearance: Option<String>,
    pub rough_edge: Option<String>,
    pub slitting_result: Option<String>,
    pub row_data: Value,
}

/// A single inspection row's worth of P3 measurements.
#[derive(Debug, Clone)]
pub struct P3ItemInput {
    pub row_no: i32,
    pub product_id: Option<String>,
    pub lot_no: String,
    pub production_date: NaiveDate,
    pub machine_no: Option<String>,
    pub mold_no: Option<String>,
    pub production_lot: Option<String>,
    pub source_winder: Option<i32>,
    pub specification: Option<String>,
    pub bottom_tape_lot: Option<String>,
    pub adjustment_record: Option<i16>,
    pub row_data: Value,
}

/// The three-sided lineage bundle a lot number resolves to.
#[derive(Debug, Clone, Default)]
pub struct LotBundle {
    pub p1: Option<P1Row>,
    pub p2: Option<P2Row>,
    pub p2_items: Vec<P2ItemRow>,
    pub p3: Option<P3Row>,
    pub p3_items: Vec<P3ItemRow>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn upsert_p1(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: &TenantId,
        lot_no_raw: &str,
        lot_no_norm: i64,
        production_date: NaiveDate,
        schema_version_id: &SchemaVersionId,
        extras: Value,
    ) -> Result<P1Id>;

    async fn upsert_p2_header(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: &TenantId,
        lot_no_raw: &str,
        lot_no_norm: i64,
        production_date: NaiveDate,
        schema_version_id: &SchemaVersionId,
        extras: Value,
    ) -> Result<P2Id>;

    async fn replace_p2_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        p2_id: &P2Id,
        tenant_id: &TenantId,
        items: Vec<P2ItemInput>,
    ) -> Result<()>;

    async fn upsert_p3_header(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: &TenantId,
        lot_no_raw: &str,
        lot_no_norm: i64,
        production_date: NaiveDate,
        extras: Value,
    ) -> Result<P3Id>;

    async fn replace_p3_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        p3_id: &P3Id,
        tenant_id: &TenantId,
        items: Vec<P3ItemInput>,
    ) -> Result<()>;

    async fn find_by_lot(&self, tenant_id: &TenantId, lot_no_norm: i64) -> Result<LotBundle>;

    async fn find_p1_by_lots(&self, tenant_id: &TenantId, lots: &[i64]) -> Result<Vec<P1Row>>;
    async fn find_p2_by_lots(&self, tenant_id: &TenantId, lots: &[i64]) -> Result<Vec<P2Row>>;
    async fn find_p2_items(
        &self,
        tenant_id: &TenantId,
        p2_record_ids: &[String],
    ) -> Result<Vec<P2ItemRow>>;
    async fn find_p3_items_by_product_ids(
        &self,
        tenant_id: &TenantId,
        product_ids: &[String],
    ) -> Result<Vec<P3ItemRow>>;
    async fn find_p3_items_by_month(
        &self,
        tenant_id: &TenantId,
        year: i32,
        month: u32,
    ) -> Result<Vec<P3ItemRow>>;
}

pub struct PgRecordStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgRecordStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl<'a> RecordStore for PgRecordStore<'a> {
    async fn upsert_p1(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: &TenantId,
        lot_no_raw: &str,
        lot_no_norm: i64,
        production_date: NaiveDate,
        schema_version_id: &SchemaVersionId,
        extras: Value,
    ) -> Result<P1Id> {
        let id = P1Id::new();
        let (id_str,): (String,) = sqlx::query_as(
            r#"INSERT INTO p1_records (id, tenant_id, lot_no_raw, lot_no_norm, production_date, schema_version_id, extras)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (tenant_id, lot_no_norm) DO UPDATE
               SET lot_no_raw = EXCLUDED.lot_no_raw,
                   production_date = EXCLUDED.production_date,
                   schema_version_id = EXCLUDED.schema_version_id,
                   extras = EXCLUDED.extras,
                   updated_at = now()
               RETURNING id"#,
        )
        .bind(id.as_str())
        .bind(tenant_id.as_str())
        .bind(lot_no_raw)
        .bind(lot_no_norm)
        .bind(production_date)
        .bind(schema_version_id.as_str())
        .bind(extras)
        .fetch_one(&mut **tx)
        .await?;
        Ok(P1Id::parse(&id_str).expect("db-issued id is always a valid uuid"))
    }

    async fn upsert_p2_header(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: &TenantId,
        lot_no_raw: &str,
        lot_no_norm: i64,
        production_date: NaiveDate,
        schema_version_id: &SchemaVersionId,
        extras: Value,
    ) -> Result<P2Id> {
        let id = P2Id::new();
        let (id_str,): (String,) = sqlx::query_as(
            r#"INSERT INTO p2_records (id, tenant_id, lot_no_raw, lot_no_norm, production_date, schema_version_id, extras)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (tenant_id, lot_no_norm) DO UPDATE
               SET lot_no_raw = EXCLUDED.lot_no_raw,
                   production_date = EXCLUDED.production_date,
                   schema_version_id = EXCLUDED.schema_version_id,
                   extras = EXCLUDED.extras,
                   updated_at = now()
               RETURNING id"#,
        )
        .bind(id.as_str())
        .bind(tenant_id.as_str())
        .bind(lot_no_raw)
        .bind(lot_no_norm)
        .bind(production_date)
        .bind(schema_version_id.as_str())
        .bind(extras)
        .fetch_one(&mut **tx)
        .await?;
        Ok(P2Id::parse(&id_str).expect("db-issued id is always a valid uuid"))
    }

    async fn replace_p2_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        p2_id: &P2Id,
        tenant_id: &TenantId,
        items: Vec<P2ItemInput>,
    ) -> Result<()> {
        sqlx::query("DELETE FROM p2_items WHERE p2_record_id = $1")
            .bind(p2_id.as_str())
            .execute(&mut **tx)
            .await?;

        for item in items {
            let id = P2ItemId::new();
            sqlx::query(
                r#"INSERT INTO p2_items
                   (id, p2_record_id, tenant_id, winder_number, sheet_width, appearance, rough_edge, slitting_result, row_data)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
            )
            .bind(id.as_str())
            .bind(p2_id.as_str())
            .bind(tenant_id.as_str())
            .bind(item.winder_number)
            .bind(item.sheet_width)
            .bind(item.appearance)
            .bind(item.rough_edge)
            .bind(item.slitting_result)
            .bind(item.row_data)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn upsert_p3_header(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: &TenantId,
        lot_no_raw: &str,
        lot_no_norm: i64,
        production_date: NaiveDate,
        extras: Value,
    ) -> Result<P3Id> {
        let id = P3Id::new();
        let (id_str,): (String,) = sqlx::query_as(
            r#"INSERT INTO p3_records (id, tenant_id, lot_no_raw, lot_no_norm, production_date, extras)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (tenant_id, lot_no_norm) DO UPDATE
               SET lot_no_raw = EXCLUDED.lot_no_raw,
                   production_date = EXCLUDED.production_date,
                   extras = EXCLUDED.extras,
                   updated_at = now()
               RETURNING id"#,
        )
        .bind(id.as_str())
        .bind(tenant_id.as_str())
        .bind(lot_no_raw)
        .bind(lot_no_norm)
        .bind(production_date)
        .bind(extras)
        .fetch_one(&mut **tx)
        .await?;
        Ok(P3Id::parse(&id_str).expect("db-issued id is always a valid uuid"))
    }

    async fn replace_p3_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        p3_id: &P3Id,
        tenant_id: &TenantId,
        items: Vec<P3ItemInput>,
    ) -> Result<()> {
        sqlx::query("DELETE FROM p3_items WHERE p3_record_id = $1")
            .bind(p3_id.as_str())
            .execute(&mut **tx)
            .await?;

        for item in items {
            let id = P3ItemId::new();
            sqlx::query(
                r#"INSERT INTO p3_items
                   (id, p3_record_id, tenant_id, row_no, product_id, lot_no, production_date,
                    machine_no, mold_no, production_lot, source_winder, specification,
                    bottom_tape_lot, adjustment_record, row_data)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
            )
            .bind(id.as_str())
            .bind(p3_id.as_str())
            .bind(tenant_id.as_str())
            .bind(item.row_no)
            .bind(item.product_id)
            .bind(item.lot_no)
            .bind(item.production_date)
            .bind(item.machine_no)
            .bind(item.mold_no)
            .bind(item.production_lot)
            .bind(item.source_winder)
            .bind(item.specification)
            .bind(item.bottom_tape_lot)
            .bind(item.adjustment_record)
            .bind(item.row_data)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn find_by_lot(&self, tenant_id: &TenantId, lot_no_norm: i64) -> Result<LotBundle> {
        let p1 = sqlx::query_as::<_, P1Row>(
            "SELECT * FROM p1_records WHERE tenant_id = $1 AND lot_no_norm = $2",
        )
        .bind(tenant_id.as_str())
        .bind(lot_no_norm)
        .fetch_optional(self.pool)
        .await?;

        let p2 = sqlx::query_as::<_, P2Row>(
            "SELECT * FROM p2_records WHERE tenant_id = $1 AND lot_no_norm = $2",
        )
        .bind(tenant_id.as_str())
        .bind(lot_no_norm)
        .fetch_optional(self.pool)
        .await?;

        let p2_items = if let Some(p2) = &p2 {
            sqlx::query_as::<_, P2ItemRow>(
                "SELECT * FROM p2_items WHERE p2_record_id = $1 ORDER BY winder_number",
            )
            .bind(&p2.id)
            .fetch_all(self.pool)
            .await?
        } else {
            Vec::new()
        };

        let p3 = sqlx::query_as::<_, P3Row>(
            "SELECT * FROM p3_records WHERE tenant_id = $1 AND lot_no_norm = $2",
        )
        .bind(tenant_id.as_str())
        .bind(lot_no_norm)
        .fetch_optional(self.pool)
        .await?;

        let p3_items = if let Some(p3) = &p3 {
            sqlx::query_as::<_, P3ItemRow>(
                "SELECT * FROM p3_items WHERE p3_record_id = $1 ORDER BY row_no",
            )
            .bind(&p3.id)
            .fetch_all(self.pool)
            .await?
        } else {
            Vec::new()
        };

        Ok(LotBundle {
            p1,
            p2,
            p2_items,
            p3,
            p3_items,
        })
    }

    async fn find_p1_by_lots(&self, tenant_id: &TenantId, lots: &[i64]) -> Result<Vec<P1Row>> {
        let rows = sqlx::query_as::<_, P1Row>(
            "SELECT * FROM p1_records WHERE tenant_id = $1 AND lot_no_norm = ANY($2)",
        )
        .bind(tenant_id.as_str())
        .bind(lots)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_p2_by_lots(&self, tenant_id: &TenantId, lots: &[i64]) -> Result<Vec<P2Row>> {
        let rows = sqlx::query_as::<_, P2Row>(
            "SELECT * FROM p2_records WHERE tenant_id = $1 AND lot_no_norm = ANY($2)",
        )
        .bind(tenant_id.as_str())
        .bind(lots)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_p2_items(
        &self,
        tenant_id: &TenantId,
        p2_record_ids: &[String],
    ) -> Result<Vec<P2ItemRow>> {
        let rows = sqlx::query_as::<_, P2ItemRow>(
            "SELECT * FROM p2_items WHERE tenant_id = $1 AND p2_record_id = ANY($2)",
        )
        .bind(tenant_id.as_str())
        .bind(p2_record_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_p3_items_by_product_ids(
        &self,
        tenant_id: &TenantId,
        product_ids: &[String],
    ) -> Result<Vec<P3ItemRow>> {
        let rows = sqlx::query_as::<_, P3ItemRow>(
            r#"SELECT * FROM p3_items
               WHERE tenant_id = $1 AND product_id = ANY($2)
               ORDER BY production_date, product_id"#,
        )
        .bind(tenant_id.as_str())
        .bind(product_ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_p3_items_by_month(
        &self,
        tenant_id: &TenantId,
        year: i32,
        month: u32,
    ) -> Result<Vec<P3ItemRow>> {
        let from = NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar month");
        let to = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .expect("valid calendar month");

        let rows = sqlx::query_as::<_, P3ItemRow>(
            r#"SELECT * FROM p3_items
               WHERE tenant_id = $1 AND production_date >= $2 AND production_date < $3
               ORDER BY production_date, product_id"#,
        )
        .bind(tenant_id.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
