//! `trace_key` is a base64url encoding of `{tenant_id, lot_no_norm}`.
//! It carries no server-side session state: given the same bytes it
//! always decodes the same way, so it never expires and needs no
//! lookup table. Decoding also re-checks the embedded tenant against
//! the caller's own tenant, so a key minted for one tenant cannot be
//! replayed against another.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use mfg_ids::TenantId;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct TraceKeyPayload {
    tenant_id: String,
    lot_no_norm: i64,
}

pub fn encode_trace_key(tenant_id: &TenantId, lot_no_norm: i64) -> String {
    let payload = TraceKeyPayload {
        tenant_id: tenant_id.as_str().to_string(),
        lot_no_norm,
    };
    let json = serde_json::to_vec(&payload).expect("trace key payload always serializes");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode `trace_key`, requiring it to belong to `tenant_id`.
pub fn decode_trace_key(tenant_id: &TenantId, trace_key: &str) -> Result<i64> {
    let bytes = URL_SAFE_NO_PAD
        .decode(trace_key)
        .map_err(|_| QueryError::InvalidTraceKey)?;
    let payload: TraceKeyPayload =
        serde_json::from_slice(&bytes).map_err(|_| QueryError::InvalidTraceKey)?;
    if payload.tenant_id != tenant_id.as_str() {
        return Err(QueryError::InvalidTraceKey);
    }
    Ok(payload.lot_no_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_for_the_owning_tenant() {
        let tenant = TenantId::new();
        let key = encode_trace_key(&tenant, 1234567890);
        assert_eq!(decode_trace_key(&tenant, &key).unwrap(), 1234567890);
    }

    #[test]
    fn rejects_a_different_tenant() {
        let tenant = TenantId::new();
        let other = TenantId::new();
        let key = encode_trace_key(&tenant, 42);
        assert!(decode_trace_key(&other, &key).is_err());
    }

    #[test]
    fn rejects_garbage_input() {
        let tenant = TenantId::new();
        assert!(decode_trace_key(&tenant, "not-a-valid-key!!").is_err());
    }
}
