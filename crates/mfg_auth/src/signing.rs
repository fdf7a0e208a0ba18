//! HMAC-SHA256 key hashing: generalizes the reference repo's bare
//! SHA-256 content hash into a keyed digest, so a leaked `key_hash`
//! column alone cannot be used to forge a credential without also
//! knowing the server secret.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hash a presented raw API key against the server secret. Deterministic:
/// the same `(secret, raw_key)` pair always produces the same digest, so
/// lookup by hash works without storing the raw key anywhere.
pub fn hash_api_key(secret: &[u8], raw_key: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts a key of any length");
    mac.update(raw_key.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Generate a new raw API key: 32 random bytes, hex-encoded. The raw
/// value is returned to the caller exactly once; only its hash is ever
/// persisted.
pub fn generate_raw_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_per_secret() {
        let a = hash_api_key(b"secret-one", "raw-key");
        let b = hash_api_key(b"secret-one", "raw-key");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_differs_across_secrets() {
        let a = hash_api_key(b"secret-one", "raw-key");
        let b = hash_api_key(b"secret-two", "raw-key");
        assert_ne!(a, b);
    }

    #[test]
    fn generated_keys_are_unique() {
        assert_ne!(generate_raw_key(), generate_raw_key());
    }
}
