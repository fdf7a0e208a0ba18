//! Normalizers for the factory-export quirks every inbound file shares:
//! lot numbers written with inconsistent separators, and dates mixing
//! Gregorian, short-year, and ROC (Republic of China, year + 1911)
//! calendars.
//!
//! Nothing here guesses: every accepted form is one of a closed set of
//! concrete patterns. Unrecognized input is a hard error, not a best
//! effort.

pub mod date;
pub mod lot;

pub use date::{candidate_columns, parse_date_value, NormalizeDateError};
pub use lot::{extract_source_winder, normalize_lot_no, normalize_p3_lot_no, NormalizedLot, NormalizeLotError};
