//! Date normalization across the Gregorian, short-year, and ROC
//! (Republic of China, year + 1911) calendars factory exports mix.
//!
//! The patterns tried are a closed, ordered list — never an open-ended
//! format-inference solver. A 7-digit head, whether separated
//! (`YYY/MM/DD`) or packed (`YYYMMDD`), is always read as ROC; it is
//! never disambiguated against a Gregorian reading.

use chrono::NaiveDate;
use mfg_protocol::TableCode;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeDateError {
    #[error("{0:?} does not match any recognized date pattern")]
    Unrecognized(String),
    #[error("{0:?} matched a date pattern but the components form an invalid calendar date")]
    InvalidCalendarDate(String),
}

const ROC_EPOCH_OFFSET: i32 = 1911;

/// Candidate source columns to probe, in order, for a given record
/// kind's production date. The first column with a parseable value
/// wins.
pub fn candidate_columns(table_code: TableCode) -> &'static [&'static str] {
    match table_code {
        TableCode::P1 => &["Production Date"],
        TableCode::P2 => &["分條時間", "Slitting Time"],
        TableCode::P3 => &["year-month-day"],
    }
}

/// Parse a single date value against the closed pattern table,
/// returning the first match.
pub fn parse_date_value(raw: &str) -> Result<NaiveDate, NormalizeDateError> {
    let trimmed = raw.trim();

    if let Some(date) = try_chinese(trimmed)? {
        return Ok(date);
    }
    if let Some(date) = try_iso_or_roc_separated(trimmed)? {
        return Ok(date);
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        if trimmed.len() == 6 {
            return try_yymmdd(trimmed);
        }
        if trimmed.len() == 7 {
            return try_roc_packed(trimmed);
        }
    }

    Err(NormalizeDateError::Unrecognized(trimmed.to_string()))
}

/// `YYYY年MM月DD日` / `YYY年MM月DD日` — the latter is ROC.
fn try_chinese(value: &str) -> Result<Option<NaiveDate>, NormalizeDateError> {
    if !value.contains('年') || !value.contains('月') || !value.contains('日') {
        return Ok(None);
    }
    let (year_part, rest) = value.split_once('年').ok_or_else(|| invalid(value))?;
    let (month_part, rest) = rest.split_once('月').ok_or_else(|| invalid(value))?;
    let day_part = rest.strip_suffix('日').ok_or_else(|| invalid(value))?;

    let year_raw: i32 = year_part.trim().parse().map_err(|_| invalid(value))?;
    let month: u32 = month_part.trim().parse().map_err(|_| invalid(value))?;
    let day: u32 = day_part.trim().parse().map_err(|_| invalid(value))?;
    let year = if year_part.trim().len() <= 3 {
        year_raw + ROC_EPOCH_OFFSET
    } else {
        year_raw
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(|| NormalizeDateError::InvalidCalendarDate(value.to_string()))
}

/// `YYYY-MM-DD`, `YYYY/MM/DD` (Gregorian) and `YYY/MM/DD`, `YYY-MM-DD`
/// (ROC, 3-digit year head).
fn try_iso_or_roc_separated(value: &str) -> Result<Option<NaiveDate>, NormalizeDateError> {
    let sep = if value.contains('-') {
        '-'
    } else if value.contains('/') {
        '/'
    } else {
        return Ok(None);
    };

    let parts: Vec<&str> = value.split(sep).collect();
    if parts.len() != 3 {
        return Ok(None);
    }
    if !parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
        return Ok(None);
    }

    let year_raw: i32 = parts[0].parse().map_err(|_| invalid(value))?;
    let month: u32 = parts[1].parse().map_err(|_| invalid(value))?;
    let day: u32 = parts[2].parse().map_err(|_| invalid(value))?;

    let year = match parts[0].len() {
        4 => year_raw,
        3 => year_raw + ROC_EPOCH_OFFSET,
        _ => return Ok(None),
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(|| NormalizeDateError::InvalidCalendarDate(value.to_string()))
}

/// `YYMMDD`, 6 packed digits, always `20YY`.
fn try_yymmdd(value: &str) -> Result<NaiveDate, NormalizeDateError> {
    let year = 2000 + value[0..2].parse::<i32>().map_err(|_| invalid(value))?;
    let month: u32 = value[2..4].parse().map_err(|_| invalid(value))?;
    let day: u32 = value[4..6].parse().map_err(|_| invalid(value))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| NormalizeDateError::InvalidCalendarDate(value.to_string()))
}

/// ROC packed `YYYMMDD`, 7 digits, always `year + 1911`.
fn try_roc_packed(value: &str) -> Result<NaiveDate, NormalizeDateError> {
    let year = value[0..3].parse::<i32>().map_err(|_| invalid(value))? + ROC_EPOCH_OFFSET;
    let month: u32 = value[3..5].parse().map_err(|_| invalid(value))?;
    let day: u32 = value[5..7].parse().map_err(|_| invalid(value))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| NormalizeDateError::InvalidCalendarDate(value.to_string()))
}

fn invalid(value: &str) -> NormalizeDateError {
    NormalizeDateError::InvalidCalendarDate(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dash_and_slash() {
        let expected = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        assert_eq!(parse_date_value("2024-11-01").unwrap(), expected);
        assert_eq!(parse_date_value("2024/11/01").unwrap(), expected);
    }

    #[test]
    fn parses_yymmdd_as_20yy() {
        assert_eq!(
            parse_date_value("241101").unwrap(),
            NaiveDate::from_ymd_opt(2024, 11, 1).unwrap()
        );
    }

    #[test]
    fn parses_roc_separated_as_year_plus_1911() {
        assert_eq!(
            parse_date_value("114/09/02").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 2).unwrap()
        );
    }

    #[test]
    fn parses_roc_packed_as_year_plus_1911() {
        assert_eq!(
            parse_date_value("1140902").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 2).unwrap()
        );
    }

    #[test]
    fn parses_chinese_roc_date() {
        assert_eq!(
            parse_date_value("114年09月02日").unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 2).unwrap()
        );
    }

    #[test]
    fn seven_digit_head_is_never_disambiguated_as_gregorian() {
        // A packed 7-digit value is always read ROC, never as a
        // (clearly invalid) 7-digit Gregorian form.
        let roc = parse_date_value("1140902").unwrap();
        assert_eq!(roc.format("%Y").to_string(), "2025");
    }

    #[test]
    fn rejects_unrecognized_pattern() {
        assert!(matches!(
            parse_date_value("not-a-date"),
            Err(NormalizeDateError::Unrecognized(_))
        ));
    }

    #[test]
    fn candidate_columns_follow_documented_order() {
        assert_eq!(candidate_columns(TableCode::P1), &["Production Date"]);
        assert_eq!(candidate_columns(TableCode::P2), &["分條時間", "Slitting Time"]);
    }
}
