//! Lot number normalization.
//!
//! Factory exports write the same lot under several separator styles
//! (`1234567-89`, `1234567_89`, `1234567 89`). Normalization strips
//! separators down to a pure digit string, which becomes the
//! `lot_no_norm` join key across P1/P2/P3.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeLotError {
    #[error("lot number has no digits after stripping separators")]
    Empty,
    #[error("lot number contains non-digit characters: {0:?}")]
    NonDigit(String),
    #[error("lot number has {0} digits, the limit is 18")]
    TooLong(usize),
}

/// A lot number after normalization: the int64 join key plus the
/// canonical `HEAD_TAIL` display form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLot {
    pub norm: i64,
    pub canonical: String,
}

const MAX_LOT_DIGITS: usize = 18;

fn is_separator(c: char) -> bool {
    c == '-' || c == '_' || c.is_whitespace()
}

/// Split on lot separators, keeping only the non-empty segments.
fn split_segments(raw: &str) -> Vec<&str> {
    raw.split(is_separator).filter(|s| !s.is_empty()).collect()
}

fn digits_from_segments(segments: &[&str]) -> Result<String, NormalizeLotError> {
    let joined: String = segments.concat();
    if joined.is_empty() {
        return Err(NormalizeLotError::Empty);
    }
    if !joined.chars().all(|c| c.is_ascii_digit()) {
        return Err(NormalizeLotError::NonDigit(joined));
    }
    if joined.len() > MAX_LOT_DIGITS {
        return Err(NormalizeLotError::TooLong(joined.len()));
    }
    Ok(joined)
}

fn to_normalized(digits: &str) -> NormalizedLot {
    let norm: i64 = digits.parse().expect("already validated as all-digit");
    let head: String = if digits.len() >= 7 {
        digits[..7].to_string()
    } else {
        format!("{:0>7}", digits)
    };
    let tail_source = if digits.len() >= 2 {
        &digits[digits.len() - 2..]
    } else {
        digits
    };
    let tail = format!("{:0>2}", tail_source);
    NormalizedLot {
        norm,
        canonical: format!("{head}_{tail}"),
    }
}

/// Normalize a P1/P2 lot number: strip separators, require an all-digit
/// remainder of at most 18 digits.
pub fn normalize_lot_no(raw: &str) -> Result<NormalizedLot, NormalizeLotError> {
    let segments = split_segments(raw);
    let digits = digits_from_segments(&segments)?;
    Ok(to_normalized(&digits))
}

/// Normalize a P3 lot number. P3 exports sometimes carry a third
/// segment used as a roll-collector suffix (e.g. `1234567-89-03`); that
/// segment is dropped before computing the join key, so a P3 item
/// resolves to the same `lot_no_norm` as the P2/P1 lot it traces to.
pub fn normalize_p3_lot_no(raw: &str) -> Result<NormalizedLot, NormalizeLotError> {
    let mut segments = split_segments(raw);
    if segments.len() >= 3 {
        segments.truncate(2);
    }
    let digits = digits_from_segments(&segments)?;
    Ok(to_normalized(&digits))
}

/// If the raw lot has a trailing `_NN` segment (1-2 digits), return it
/// as the source winder number; otherwise `None`.
pub fn extract_source_winder(lot_raw: &str) -> Option<u32> {
    let (_, suffix) = lot_raw.rsplit_once('_')?;
    if suffix.is_empty() || suffix.len() > 2 || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_dash_and_underscore_separators() {
        let a = normalize_lot_no("1234567-89").unwrap();
        let b = normalize_lot_no("1234567_89").unwrap();
        let c = normalize_lot_no("1234567 89").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.canonical, "1234567_89");
        assert_eq!(a.norm, 123456789);
    }

    #[test]
    fn rejects_non_digit_remainder() {
        assert_eq!(
            normalize_lot_no("ABC-123"),
            Err(NormalizeLotError::NonDigit("ABC123".to_string()))
        );
    }

    #[test]
    fn rejects_over_18_digits() {
        let raw = "1".repeat(19);
        assert_eq!(normalize_lot_no(&raw), Err(NormalizeLotError::TooLong(19)));
    }

    #[test]
    fn rejects_empty_after_stripping() {
        assert_eq!(normalize_lot_no("--  __"), Err(NormalizeLotError::Empty));
    }

    #[test]
    fn p3_variant_drops_roll_collector_suffix() {
        let p1_style = normalize_lot_no("1234567-89").unwrap();
        let p3_style = normalize_p3_lot_no("1234567-89-03").unwrap();
        assert_eq!(p1_style, p3_style);
    }

    #[test]
    fn extracts_trailing_winder_suffix() {
        assert_eq!(extract_source_winder("1234567_89_03"), Some(3));
        assert_eq!(extract_source_winder("1234567_89_15"), Some(15));
        assert_eq!(extract_source_winder("1234567-89"), None);
        assert_eq!(extract_source_winder("1234567_abc"), None);
    }
}
