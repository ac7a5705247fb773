//! JSON record documents → `RecordTable`.
//!
//! Two layouts are accepted:
//! - records: `[{"icao24": ..., "timestamp": ..., ...}, ...]`
//! - columns: `{"icao24": {"0": ..., "1": ...}, ...}` or
//!   `{"icao24": [...], ...}`
//!
//! Row labels of the column layout are ordered numerically when they are
//! integers. A required column missing from the whole document is an error;
//! a cell missing from one row is null.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value as Json};

use crate::table::RecordTable;
use crate::types::*;

/// Epoch numbers at or above this are milliseconds, below are seconds.
const EPOCH_MILLIS_CUTOFF: f64 = 1e11;

/// Read and parse a record document from disk.
pub fn read_json_file(path: &Path) -> Result<RecordTable> {
    let text = std::fs::read_to_string(path)?;
    let table = parse_json(&text)?;
    tracing::debug!(
        path = %path.display(),
        rows = table.len(),
        extra_columns = table.extra_columns().len(),
        "loaded record document"
    );
    Ok(table)
}

/// Parse a record document held in memory.
pub fn parse_json(text: &str) -> Result<RecordTable> {
    let doc: Json = serde_json::from_str(text)?;
    let (names, rows) = match doc {
        Json::Array(items) => {
            let rows = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Json::Object(obj) => Ok(obj),
                    other => Err(FlightError::Malformed(format!(
                        "row {i} is not an object: {other}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            (row_keys(&rows), rows)
        }
        Json::Object(columns) => columns_to_rows(columns)?,
        _ => {
            return Err(FlightError::Malformed(
                "expected an array of records or an object of columns".into(),
            ))
        }
    };
    build_table(names, rows)
}

/// Column names of the records layout, in order of first appearance.
fn row_keys(rows: &[Map<String, Json>]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }
    names
}

/// Transpose the column layout into row objects. Column names are returned
/// separately since a column without cells contributes to no row.
fn columns_to_rows(columns: Map<String, Json>) -> Result<(Vec<String>, Vec<Map<String, Json>>)> {
    // label -> row, ordered by (numeric label, text label)
    let mut rows: BTreeMap<RowLabel, Map<String, Json>> = BTreeMap::new();
    let mut names: Vec<String> = Vec::with_capacity(columns.len());

    for (name, cells) in columns {
        names.push(name.clone());
        match cells {
            Json::Array(values) => {
                for (i, v) in values.into_iter().enumerate() {
                    rows.entry(RowLabel::Position(i as u64))
                        .or_default()
                        .insert(name.clone(), v);
                }
            }
            Json::Object(values) => {
                for (label, v) in values {
                    rows.entry(RowLabel::parse(label))
                        .or_default()
                        .insert(name.clone(), v);
                }
            }
            other => {
                return Err(FlightError::Malformed(format!(
                    "column {name} is neither an array nor an object: {other}"
                )))
            }
        }
    }

    Ok((names, rows.into_values().collect()))
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum RowLabel {
    Position(u64),
    Text(String),
}

impl RowLabel {
    fn parse(label: String) -> Self {
        match label.parse::<u64>() {
            Ok(n) => RowLabel::Position(n),
            Err(_) => RowLabel::Text(label),
        }
    }
}

fn build_table(names: Vec<String>, rows: Vec<Map<String, Json>>) -> Result<RecordTable> {
    for &required in REQUIRED_COLUMNS {
        if !names.iter().any(|n| n == required) {
            return Err(FlightError::MissingColumn(required));
        }
    }

    let extra_columns: Vec<String> = names
        .into_iter()
        .filter(|n| Column::required(n).is_none())
        .collect();

    let records = rows
        .iter()
        .enumerate()
        .map(|(i, row)| parse_record(i, row, &extra_columns))
        .collect::<Result<Vec<_>>>()?;

    Ok(RecordTable::with_extra_columns(records, extra_columns))
}

fn parse_record(row: usize, obj: &Map<String, Json>, extra_columns: &[String]) -> Result<Record> {
    let timestamp = match obj.get(COL_TIMESTAMP) {
        Some(v) if !v.is_null() => parse_timestamp(v)
            .ok_or_else(|| FlightError::Malformed(format!("row {row}: bad timestamp {v}")))?,
        _ => {
            return Err(FlightError::Malformed(format!(
                "row {row}: timestamp is missing"
            )))
        }
    };

    let mut rec = Record::new(
        &text_cell(obj, COL_ICAO24),
        &text_cell(obj, COL_CALLSIGN),
        timestamp,
    );
    rec.latitude = number_cell(row, obj, COL_LATITUDE)?;
    rec.longitude = number_cell(row, obj, COL_LONGITUDE)?;
    rec.altitude = number_cell(row, obj, COL_ALTITUDE)?;
    rec.vertical_rate = number_cell(row, obj, COL_VERTICAL_RATE)?;
    rec.extra = extra_columns
        .iter()
        .map(|name| obj.get(name).map(extra_cell).unwrap_or(Value::Null))
        .collect();
    Ok(rec)
}

/// Identifier cell; null or missing becomes the empty string.
fn text_cell(obj: &Map<String, Json>, name: &str) -> String {
    match obj.get(name) {
        Some(Json::String(s)) => s.clone(),
        Some(Json::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn number_cell(row: usize, obj: &Map<String, Json>, name: &str) -> Result<Option<f64>> {
    match obj.get(name) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(FlightError::Malformed(format!(
            "row {row}: {name} is not a number: {other}"
        ))),
    }
}

fn extra_cell(v: &Json) -> Value {
    match v {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
        Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        Json::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Timestamp cell: epoch seconds or milliseconds, or a date-time string.
pub fn parse_timestamp(v: &Json) -> Option<DateTime<Utc>> {
    match v {
        Json::Number(n) => epoch_to_utc(n.as_f64()?),
        Json::String(s) => parse_time_str(s),
        _ => None,
    }
}

fn epoch_to_utc(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() >= EPOCH_MILLIS_CUTOFF {
        value
    } else {
        value * 1000.0
    };
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]` (UTC), or a bare `YYYY-MM-DD`.
pub fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
