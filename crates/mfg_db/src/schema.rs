//! CREATE TABLE statements for every table in the data model. Single
//! source of truth, following the reference repository's
//! `ensure_schema` / `create_*_tables` split.

use sqlx::PgPool;
use tracing::info;

use crate::error::Result;

pub(crate) async fn ensure_schema(pool: &PgPool) -> Result<()> {
    create_tenant_tables(pool).await?;
    create_schema_registry_tables(pool).await?;
    create_record_tables(pool).await?;
    create_job_tables(pool).await?;
    create_staging_tables(pool).await?;
    info!("database schema verified");
    Ok(())
}

async fn create_tenant_tables(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            is_default BOOLEAN NOT NULL DEFAULT FALSE,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    )
    .execute(pool)
    .await?;

    // Only one tenant may carry is_default = true.
    sqlx::query(
        r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_tenants_single_default
            ON tenants ((is_default)) WHERE is_default"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS tenant_api_keys (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            key_hash TEXT NOT NULL UNIQUE,
            label TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            revoked_at TIMESTAMPTZ,
            last_used_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_api_keys_tenant ON tenant_api_keys(tenant_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_registry_tables(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS schema_versions (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            table_code TEXT NOT NULL,
            schema_hash TEXT NOT NULL,
            header_fingerprint TEXT NOT NULL,
            schema_json JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE(tenant_id, table_code, header_fingerprint)
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_schema_versions_lookup ON schema_versions(tenant_id, table_code)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS tenant_flatten_columns (
            tenant_id TEXT PRIMARY KEY REFERENCES tenants(id),
            map_version INTEGER NOT NULL DEFAULT 1,
            columns_json JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_record_tables(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS p1_records (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            lot_no_raw TEXT NOT NULL,
            lot_no_norm BIGINT NOT NULL,
            production_date DATE NOT NULL,
            schema_version_id TEXT NOT NULL REFERENCES schema_versions(id),
            extras JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE(tenant_id, lot_no_norm)
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_p1_tenant_date ON p1_records(tenant_id, production_date)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS p2_records (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            lot_no_raw TEXT NOT NULL,
            lot_no_norm BIGINT NOT NULL,
            production_date DATE NOT NULL,
            schema_version_id TEXT NOT NULL REFERENCES schema_versions(id),
            extras JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE(tenant_id, lot_no_norm)
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_p2_tenant_date ON p2_records(tenant_id, production_date)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS p2_items (
            id TEXT PRIMARY KEY,
            p2_record_id TEXT NOT NULL REFERENCES p2_records(id) ON DELETE CASCADE,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            winder_number INTEGER NOT NULL,
            sheet_width DOUBLE PRECISION,
            thickness1 DOUBLE PRECISION,
            thickness2 DOUBLE PRECISION,
            thickness3 DOUBLE PRECISION,
            thickness4 DOUBLE PRECISION,
            thickness5 DOUBLE PRECISION,
            thickness6 DOUBLE PRECISION,
            thickness7 DOUBLE PRECISION,
            appearance TEXT,
            rough_edge TEXT,
            slitting_result TEXT,
            row_data JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE(p2_record_id, winder_number)
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_p2_items_record ON p2_items(p2_record_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS p3_records (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            lot_no_raw TEXT NOT NULL,
            lot_no_norm BIGINT NOT NULL,
            production_date DATE NOT NULL,
            extras JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE(tenant_id, lot_no_norm)
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_p3_tenant_date ON p3_records(tenant_id, production_date)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS p3_items (
            id TEXT PRIMARY KEY,
            p3_record_id TEXT NOT NULL REFERENCES p3_records(id) ON DELETE CASCADE,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            row_no INTEGER NOT NULL,
            product_id TEXT,
            lot_no TEXT NOT NULL,
            production_date DATE NOT NULL,
            machine_no TEXT,
            mold_no TEXT,
            production_lot TEXT,
            source_winder INTEGER,
            specification TEXT,
            bottom_tape_lot TEXT,
            adjustment_record SMALLINT,
            row_data JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE(p3_record_id, row_no)
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_p3_items_product_id ON p3_items(tenant_id, product_id) WHERE product_id IS NOT NULL",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_p3_items_winder ON p3_items(p3_record_id, source_winder)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_job_tables(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS import_jobs (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            table_code TEXT NOT NULL,
            status TEXT NOT NULL,
            total_rows INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            progress SMALLINT NOT NULL DEFAULT 0,
            header_fingerprint TEXT,
            schema_version_id TEXT REFERENCES schema_versions(id),
            error_summary JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_tenant_status ON import_jobs(tenant_id, status)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS import_files (
            id TEXT PRIMARY KEY,
            job_id TEXT NOT NULL REFERENCES import_jobs(id) ON DELETE CASCADE,
            filename TEXT NOT NULL,
            sha256 TEXT NOT NULL,
            size_bytes BIGINT NOT NULL,
            blob_ref TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_job ON import_files(job_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_staging_tables(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS staging_rows (
            id TEXT PRIMARY KEY,
            job_id TEXT NOT NULL REFERENCES import_jobs(id) ON DELETE CASCADE,
            file_id TEXT NOT NULL REFERENCES import_files(id) ON DELETE CASCADE,
            row_index INTEGER NOT NULL,
            parsed_json JSONB NOT NULL,
            errors_json JSONB
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_staging_job ON staging_rows(job_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_staging_job_errors ON staging_rows(job_id) WHERE errors_json IS NOT NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS row_edits (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            table_code TEXT NOT NULL,
            record_id TEXT NOT NULL,
            before_json JSONB NOT NULL,
            after_json JSONB NOT NULL,
            reason_id SMALLINT NOT NULL,
            actor_id TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_row_edits_record ON row_edits(tenant_id, table_code, record_id)")
        .execute(pool)
        .await?;

    Ok(())
}
