//! Turns validated rows into the record-table writes the COMMITTING
//! stage applies in one transaction. Column names are the canonical
//! ones a schema version declares; the header/field glossary fixes
//! `lot_no` as the shared lot column across all three tables.

use std::collections::HashMap;

use chrono::NaiveDate;
use mfg_db::{P2ItemInput, P3ItemInput};
use mfg_normalize::{extract_source_winder, normalize_lot_no, normalize_p3_lot_no, NormalizedLot};
use mfg_protocol::TableCode;
use mfg_validate::CoercedValue;
use serde_json::Value;

use crate::error::{PipelineError, Result};

/// One row's coerced values plus the raw `parsed_json` it came from,
/// kept for `row_data`/`extras`.
pub struct CommitRow {
    pub row_index: i64,
    pub values: HashMap<String, CoercedValue>,
    pub raw: Value,
}

pub struct P1Commit {
    pub lot: NormalizedLot,
    pub production_date: NaiveDate,
    pub extras: Value,
}

pub struct P2Commit {
    pub lot: NormalizedLot,
    pub production_date: NaiveDate,
    pub extras: Value,
    pub items: Vec<P2ItemInput>,
}

pub struct P3Commit {
    pub lot: NormalizedLot,
    pub production_date: NaiveDate,
    pub extras: Value,
    pub items: Vec<P3ItemInput>,
}

fn lot_text(values: &HashMap<String, CoercedValue>) -> Result<&str> {
    values
        .get("lot_no")
        .and_then(CoercedValue::as_text)
        .ok_or(PipelineError::InvalidState)
}

fn date_value(values: &HashMap<String, CoercedValue>, candidates: &[&str]) -> Result<NaiveDate> {
    candidates
        .iter()
        .find_map(|name| values.get(*name).and_then(CoercedValue::as_date))
        .ok_or(PipelineError::InvalidState)
}

/// P1: exactly one row per lot in a well-formed batch; the last row
/// seen for a given lot wins if a file somehow repeats one (cross-row
/// uniqueness should already have rejected that before commit).
pub fn build_p1(rows: &[CommitRow]) -> Result<Vec<P1Commit>> {
    let mut out = Vec::new();
    for row in rows {
        let lot = normalize_lot_no(lot_text(&row.values)?).map_err(|_| PipelineError::InvalidState)?;
        let production_date = date_value(&row.values, mfg_normalize::candidate_columns(TableCode::P1))?;
        out.push(P1Commit {
            lot,
            production_date,
            extras: row.raw.clone(),
        });
    }
    Ok(out)
}

/// P2: group winder item rows under one header per `lot_no_norm`.
pub fn build_p2(rows: &[CommitRow]) -> Result<Vec<P2Commit>> {
    let mut by_lot: HashMap<i64, P2Commit> = HashMap::new();
    for row in rows {
        let lot = normalize_lot_no(lot_text(&row.values)?).map_err(|_| PipelineError::InvalidState)?;
        let production_date = date_value(&row.values, mfg_normalize::candidate_columns(TableCode::P2))?;
        let winder_number = row
            .values
            .get("winder_number")
            .and_then(CoercedValue::as_i64)
            .ok_or(PipelineError::InvalidState)? as i32;

        let item = P2ItemInput {
            winder_number,
            sheet_width: row.values.get("sheet_width").and_then(CoercedValue::as_f64),
            appearance: row.values.get("appearance").and_then(CoercedValue::as_text).map(str::to_string),
            rough_edge: row.values.get("rough_edge").and_then(CoercedValue::as_text).map(str::to_string),
            slitting_result: row
                .values
                .get("slitting_result")
                .and_then(CoercedValue::as_text)
                .map(str::to_string),
            row_data: row.raw.clone(),
        };

        by_lot
            .entry(lot.norm)
            .or_insert_with(|| P2Commit {
                lot: lot.clone(),
                production_date,
                extras: row.raw.clone(),
                items: Vec::new(),
            })
            .items
            .push(item);
    }
    Ok(by_lot.into_values().collect())
}

/// P3: group inspection rows under one header per `lot_no_norm`.
/// `row_no` is the row's 1-based sequence within the file, not a parsed
/// column; `source_winder` is extracted from the raw lot text, not a
/// separate column either.
pub fn build_p3(rows: &[CommitRow]) -> Result<Vec<P3Commit>> {
    let mut by_lot: HashMap<i64, P3Commit> = HashMap::new();
    for row in rows {
        let lot_raw = lot_text(&row.values)?;
        let lot = normalize_p3_lot_no(lot_raw).map_err(|_| PipelineError::InvalidState)?;
        let production_date = date_value(&row.values, mfg_normalize::candidate_columns(TableCode::P3))?;

        let item = P3ItemInput {
            row_no: row.row_index as i32,
            product_id: row.values.get("product_id").and_then(CoercedValue::as_text).map(str::to_string),
            lot_no: lot_raw.to_string(),
            production_date,
            machine_no: row.values.get("machine_no").and_then(CoercedValue::as_text).map(str::to_string),
            mold_no: row.values.get("mold_no").and_then(CoercedValue::as_text).map(str::to_string),
            production_lot: row
                .values
                .get("production_lot")
                .and_then(CoercedValue::as_text)
                .map(str::to_string),
            source_winder: extract_source_winder(lot_raw).map(|w| w as i32),
            specification: row
                .values
                .get("specification")
                .and_then(CoercedValue::as_text)
                .map(str::to_string),
            bottom_tape_lot: row
                .values
                .get("bottom_tape_lot")
                .and_then(CoercedValue::as_text)
                .map(str::to_string),
            adjustment_record: row.values.get("adjustment_record").and_then(CoercedValue::as_i64).map(|v| v as i16),
            row_data: row.raw.clone(),
        };

        by_lot
            .entry(lot.norm)
            .or_insert_with(|| P3Commit {
                lot: lot.clone(),
                production_date,
                extras: row.raw.clone(),
                items: Vec::new(),
            })
            .items
            .push(item);
    }
    Ok(by_lot.into_values().collect())
}
