//! Resolves a presented API key to a [`ResolvedCaller`]: the only form
//! of caller identity the rest of the core accepts. Nothing downstream
//! re-derives a tenant from a header.

use mfg_db::{MfgDb, TenantStore};
use mfg_ids::TenantId;
use mfg_protocol::ResolvedCaller;

use crate::error::AuthError;
use crate::signing::hash_api_key;

pub async fn resolve(db: &MfgDb, secret: &[u8], presented_key: &str) -> Result<ResolvedCaller, AuthError> {
    let key_hash = hash_api_key(secret, presented_key);
    let tenants = db.tenants();
    let key_row = tenants
        .resolve_by_key_hash(&key_hash)
        .await?
        .ok_or(AuthError::KeyNotFound)?;

    let _ = tenants.touch_last_used(&mfg_ids::ApiKeyId::parse(&key_row.id).expect("db-issued id is always a valid uuid")).await;

    Ok(ResolvedCaller {
        tenant_id: TenantId::parse(&key_row.tenant_id).expect("db-issued id is always a valid uuid"),
        key_id: mfg_ids::ApiKeyId::parse(&key_row.id).expect("db-issued id is always a valid uuid"),
        actor_id: key_row.id,
    })
}
