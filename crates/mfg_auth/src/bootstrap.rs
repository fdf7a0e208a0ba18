//! Tenant + API-key provisioning, used by the `bootstrap_tenant_api_key`
//! CLI command. Not part of the request-path auth contract.

use mfg_db::{ApiKeyRow, DbError, MfgDb, TenantStore};

use crate::signing::{generate_raw_key, hash_api_key};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("tenant {0:?} already exists")]
    TenantExists(String),
    #[error(transparent)]
    Db(#[from] DbError),
}

pub struct BootstrappedKey {
    pub tenant_id: String,
    pub api_key_id: String,
    pub raw_key: String,
}

/// Create a tenant (failing if the code is already taken) and issue its
/// first API key. Returns the raw key exactly once; only its hash is
/// ever persisted.
pub async fn bootstrap_tenant_api_key(
    db: &MfgDb,
    secret: &[u8],
    tenant_code: &str,
    label: &str,
) -> Result<BootstrappedKey, BootstrapError> {
    let tenants = db.tenants();
    if tenants.get_tenant_by_code(tenant_code).await?.is_some() {
        return Err(BootstrapError::TenantExists(tenant_code.to_string()));
    }

    let tenant = tenants.create_tenant(tenant_code, tenant_code, false).await?;
    let raw_key = generate_raw_key();
    let key_hash = hash_api_key(secret, &raw_key);
    let key_row: ApiKeyRow = tenants
        .create_api_key(
            &mfg_ids::TenantId::parse(&tenant.id).expect("db-issued id is always a valid uuid"),
            &key_hash,
            label,
        )
        .await?;

    Ok(BootstrappedKey {
        tenant_id: tenant.id,
        api_key_id: key_row.id,
        raw_key,
    })
}
