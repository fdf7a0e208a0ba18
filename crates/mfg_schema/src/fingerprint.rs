//! Header canonicalization and fingerprinting.
//!
//! `header_fingerprint = sha256(json.encode(ordered_trimmed_headers))`.
//! Matching is exact on the canonicalized sequence: each cell trimmed,
//! internal whitespace collapsed to a single space, comparison
//! case-sensitive.

use sha2::{Digest, Sha256};

/// Trim each header cell and collapse internal whitespace runs to a
/// single space. Does not change case.
pub fn canonicalize_header(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|cell| collapse_whitespace(cell.trim())).collect()
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

/// Compute the fingerprint of an already-canonicalized header sequence.
pub fn fingerprint(canonical_header: &[String]) -> String {
    let encoded = serde_json::to_vec(canonical_header).expect("string vec always serializes");
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    hex::encode(hasher.finalize())
}

/// Canonicalize and fingerprint in one step.
pub fn fingerprint_raw_header(raw: &[&str]) -> String {
    fingerprint(&canonicalize_header(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_internal_whitespace_and_trims() {
        let canon = canonicalize_header(&["  lot no  ", "winder\t number", "notes"]);
        assert_eq!(canon, vec!["lot no", "winder number", "notes"]);
    }

    #[test]
    fn fingerprint_is_stable_for_equal_canonical_headers() {
        let a = fingerprint_raw_header(&["lot_no", "  winder  "]);
        let b = fingerprint_raw_header(&["lot_no", "winder"]);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_is_case_sensitive() {
        let a = fingerprint_raw_header(&["Lot_No"]);
        let b = fingerprint_raw_header(&["lot_no"]);
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_differs_on_order() {
        let a = fingerprint_raw_header(&["a", "b"]);
        let b = fingerprint_raw_header(&["b", "a"]);
        assert_ne!(a, b);
    }
}
