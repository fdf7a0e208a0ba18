//! End-to-end tests for the schema registry against a real Postgres
//! instance: register a version, resolve it back by header, confirm
//! immutability (re-registering the same header inserts a new version
//! rather than mutating the old one), and round-trip the per-tenant
//! flatten-column override.

#![cfg(feature = "docker-tests")]

use mfg_db::{MfgDb, TenantStore};
use mfg_protocol::{DataType, TableCode};
use mfg_schema::{ColumnSpec, RegistryError, SchemaRegistry, SchemaStorage};
use mfg_test_utils::{DbVersion, TestPgPool};

async fn test_db() -> (MfgDb, mfg_ids::TenantId) {
    let test_pool = TestPgPool::new(DbVersion::Postgres16)
        .await
        .expect("docker postgres available");
    let db = MfgDb::new(test_pool.pool.clone());
    db.ensure_schema().await.expect("schema migrates");

    let tenant = db
        .tenants()
        .create_tenant(&format!("t-{}", uuid::Uuid::new_v4().simple()), "Test Tenant", false)
        .await
        .expect("tenant created");
    let tenant_id = mfg_ids::TenantId::parse(&tenant.id).unwrap();
    (db, tenant_id)
}

fn p3_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::required("lot_no", DataType::Text),
        ColumnSpec::required("production_date", DataType::Date),
        ColumnSpec::optional("notes", DataType::Text),
    ]
}

#[tokio::test]
async fn registers_and_resolves_by_header() {
    let (db, tenant_id) = test_db().await;
    let registry = SchemaRegistry::new(SchemaStorage::new(db));

    let header = ["lot_no", "production_date", "notes"];
    let registered = registry
        .register(&tenant_id, TableCode::P3, &header, p3_columns())
        .await
        .expect("register succeeds");

    let resolved = registry
        .resolve(&tenant_id, TableCode::P3, &header)
        .await
        .expect("resolve succeeds");

    assert_eq!(resolved.id, registered.id);
    assert_eq!(resolved.columns.len(), 3);
    assert_eq!(resolved.column("lot_no").unwrap().data_type, DataType::Text);
}

#[tokio::test]
async fn resolve_is_insensitive_to_header_whitespace() {
    let (db, tenant_id) = test_db().await;
    let registry = SchemaRegistry::new(SchemaStorage::new(db));

    registry
        .register(&tenant_id, TableCode::P3, &["lot_no", "production_date", "notes"], p3_columns())
        .await
        .expect("register succeeds");

    let resolved = registry
        .resolve(&tenant_id, TableCode::P3, &["  lot_no ", "production_date", " notes"])
        .await
        .expect("resolve tolerates trimmed whitespace");

    assert_eq!(resolved.columns.len(), 3);
}

#[tokio::test]
async fn resolve_of_unknown_header_fails_with_header_mismatch() {
    let (db, tenant_id) = test_db().await;
    let registry = SchemaRegistry::new(SchemaStorage::new(db));

    let err = registry
        .resolve(&tenant_id, TableCode::P3, &["never", "registered"])
        .await
        .expect_err("unregistered header cannot resolve");

    assert!(matches!(err, RegistryError::HeaderMismatch));
    assert_eq!(err.error_code(), mfg_protocol::ErrorCode::EHeaderMismatch);
}

#[tokio::test]
async fn re_registering_same_header_creates_a_new_immutable_version() {
    let (db, tenant_id) = test_db().await;
    let registry = SchemaRegistry::new(SchemaStorage::new(db));

    let header = ["lot_no", "production_date", "notes"];
    let v1 = registry
        .register(&tenant_id, TableCode::P3, &header, p3_columns())
        .await
        .expect("first register succeeds");

    let mut widened = p3_columns();
    widened.push(ColumnSpec::optional("operator", DataType::Text));
    let v2 = registry
        .register(&tenant_id, TableCode::P3, &header, widened)
        .await
        .expect("second register succeeds");

    assert_ne!(v1.id, v2.id);

    // Resolve now returns the newest version for this fingerprint, and
    // the prior version is still fetchable by id.
    let resolved = registry.resolve(&tenant_id, TableCode::P3, &header).await.unwrap();
    assert_eq!(resolved.id, v2.id);
    assert_eq!(resolved.columns.len(), 4);

    let original = registry.get(&v1.id).await.expect("old version still readable");
    assert_eq!(original.columns.len(), 3);
}

#[tokio::test]
async fn schema_versions_are_isolated_per_tenant() {
    let (db, tenant_a) = test_db().await;
    let tenant_b = db
        .tenants()
        .create_tenant(&format!("t-{}", uuid::Uuid::new_v4().simple()), "Other Tenant", false)
        .await
        .expect("second tenant created")
        .id;
    let tenant_b = mfg_ids::TenantId::parse(&tenant_b).unwrap();

    let registry = SchemaRegistry::new(SchemaStorage::new(db));
    let header = ["lot_no", "production_date", "notes"];
    registry
        .register(&tenant_a, TableCode::P3, &header, p3_columns())
        .await
        .expect("tenant a registers");

    let err = registry
        .resolve(&tenant_b, TableCode::P3, &header)
        .await
        .expect_err("tenant b has never registered this header");
    assert!(matches!(err, RegistryError::HeaderMismatch));
}

#[tokio::test]
async fn flatten_columns_round_trip_defaults_to_none() {
    let (db, tenant_id) = test_db().await;
    let registry = SchemaRegistry::new(SchemaStorage::new(db));

    assert!(registry.flatten_columns(&tenant_id).await.unwrap().is_none());

    let columns = serde_json::json!([{"field": "lot_no_norm", "label": "Lot"}]);
    registry.set_flatten_columns(&tenant_id, columns.clone()).await.unwrap();

    let stored = registry.flatten_columns(&tenant_id).await.unwrap();
    assert_eq!(stored, Some(columns));
}
