//! Layer 3: in-file (cross-row) uniqueness.
//!
//! P2 requires unique `(lot_no_norm, winder_number)` within the batch;
//! P3 requires unique `product_id`. A duplicate marks every row after
//! the first occurrence.

use std::collections::HashMap;

use mfg_schema::SchemaViolation;

/// Check a batch of `(row_index, key)` pairs for duplicates, returning
/// the row indices (second and later occurrences) that violate
/// uniqueness, paired with the violation to attach.
pub fn check_unique_in_file<K: Eq + std::hash::Hash + Clone>(
    keys: &[(usize, Option<K>)],
    field: &str,
) -> HashMap<usize, SchemaViolation> {
    let mut seen: HashMap<K, usize> = HashMap::new();
    let mut violations = HashMap::new();

    for (row_index, key) in keys {
        let Some(key) = key else { continue };
        if let Some(&first_seen) = seen.get(key) {
            violations.insert(
                *row_index,
                SchemaViolation {
                    field: field.to_string(),
                    error_code: "E_UNIQUE_IN_FILE".to_string(),
                    message: format!("duplicate of row {first_seen} within this batch"),
                    value: None,
                },
            );
        } else {
            seen.insert(key.clone(), *row_index);
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_second_and_later_duplicates_only() {
        let keys = vec![
            (0, Some((100i64, 1u32))),
            (1, Some((100i64, 1u32))),
            (2, Some((100i64, 2u32))),
            (3, Some((100i64, 1u32))),
        ];
        let violations = check_unique_in_file(&keys, "winder_number");
        assert_eq!(violations.len(), 2);
        assert!(violations.contains_key(&1));
        assert!(violations.contains_key(&3));
        assert!(!violations.contains_key(&2));
    }

    #[test]
    fn none_keys_are_skipped() {
        let keys: Vec<(usize, Option<i64>)> = vec![(0, None), (1, None)];
        assert!(check_unique_in_file(&keys, "product_id").is_empty());
    }
}
