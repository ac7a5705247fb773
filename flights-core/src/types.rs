//! Shared types, error enum, and record/column/value types for flights-core.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// All errors produced by flights-core.
#[derive(Debug, Error)]
pub enum FlightError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed record data: {0}")]
    Malformed(String),
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    #[error("invalid lookup key: {0}")]
    InvalidKey(String),
    #[error("flight has no records")]
    EmptyFlight,
    #[error("config error: {0}")]
    Config(String),
}

impl FlightError {
    /// True for every error raised while loading a record document.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            FlightError::Io(_)
                | FlightError::Json(_)
                | FlightError::Malformed(_)
                | FlightError::MissingColumn(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FlightError>;

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

pub const COL_ICAO24: &str = "icao24";
pub const COL_CALLSIGN: &str = "callsign";
pub const COL_TIMESTAMP: &str = "timestamp";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";
pub const COL_ALTITUDE: &str = "altitude";
pub const COL_VERTICAL_RATE: &str = "vertical_rate";

/// Columns every record document must carry, in display order.
pub const REQUIRED_COLUMNS: &[&str] = &[
    COL_ICAO24,
    COL_CALLSIGN,
    COL_TIMESTAMP,
    COL_LATITUDE,
    COL_LONGITUDE,
    COL_ALTITUDE,
    COL_VERTICAL_RATE,
];

/// A resolved column reference. Obtain one through `RecordTable::column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    Icao24,
    Callsign,
    Timestamp,
    Latitude,
    Longitude,
    Altitude,
    VerticalRate,
    Extra(String),
}

impl Column {
    /// Map a required column name to its variant. Extra columns return `None`.
    pub fn required(name: &str) -> Option<Column> {
        match name {
            COL_ICAO24 => Some(Column::Icao24),
            COL_CALLSIGN => Some(Column::Callsign),
            COL_TIMESTAMP => Some(Column::Timestamp),
            COL_LATITUDE => Some(Column::Latitude),
            COL_LONGITUDE => Some(Column::Longitude),
            COL_ALTITUDE => Some(Column::Altitude),
            COL_VERTICAL_RATE => Some(Column::VerticalRate),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Column::Icao24 => COL_ICAO24,
            Column::Callsign => COL_CALLSIGN,
            Column::Timestamp => COL_TIMESTAMP,
            Column::Latitude => COL_LATITUDE,
            Column::Longitude => COL_LONGITUDE,
            Column::Altitude => COL_ALTITUDE,
            Column::VerticalRate => COL_VERTICAL_RATE,
            Column::Extra(name) => name,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// A single cell, as returned by column aggregates.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Time(DateTime<Utc>),
    Number(f64),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Order two values of the same kind. Mixed kinds, NaN, and nulls are
    /// incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(n) if !n.is_nan() => Value::Number(n),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            Value::Number(n) => write!(f, "{n}"),
            Value::Null => f.write_str("null"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One surveillance sample.
///
/// `index` is the row's position in the originally loaded table and
/// survives every filter and split.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub index: usize,
    pub icao24: String,
    pub callsign: String,
    pub timestamp: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub vertical_rate: Option<f64>,
    /// Extra columns, parallel to the owning table's extra column names.
    pub extra: Vec<Value>,
}

impl Record {
    pub fn new(icao24: &str, callsign: &str, timestamp: DateTime<Utc>) -> Self {
        Record {
            index: 0,
            icao24: icao24.to_string(),
            callsign: callsign.to_string(),
            timestamp,
            latitude: None,
            longitude: None,
            altitude: None,
            vertical_rate: None,
            extra: Vec::new(),
        }
    }

    pub fn with_position(mut self, lat: f64, lon: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lon);
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_vertical_rate(mut self, rate: f64) -> Self {
        self.vertical_rate = Some(rate);
        self
    }

    /// Read a cell. Extra columns are addressed by their slot in
    /// `extra_names`.
    pub fn get(&self, column: &Column, extra_names: &[String]) -> Value {
        match column {
            Column::Icao24 => Value::Text(self.icao24.clone()),
            Column::Callsign => Value::Text(self.callsign.clone()),
            Column::Timestamp => Value::Time(self.timestamp),
            Column::Latitude => self.latitude.into(),
            Column::Longitude => self.longitude.into(),
            Column::Altitude => self.altitude.into(),
            Column::VerticalRate => self.vertical_rate.into(),
            Column::Extra(name) => extra_names
                .iter()
                .position(|n| n == name)
                .and_then(|i| self.extra.get(i))
                .cloned()
                .unwrap_or(Value::Null),
        }
    }

    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_required_column_names() {
        for name in REQUIRED_COLUMNS {
            let col = Column::required(name).unwrap();
            assert_eq!(col.name(), *name);
        }
        assert!(Column::required("groundspeed").is_none());
    }

    #[test]
    fn test_value_compare_same_kind() {
        assert_eq!(
            Value::Number(1.0).compare(&Value::Number(2.0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Text("b".into()).compare(&Value::Text("a".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Time(ts(10)).compare(&Value::Time(ts(10))),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_value_compare_mixed_kinds() {
        assert!(Value::Number(1.0).compare(&Value::Text("1".into())).is_none());
        assert!(Value::Null.compare(&Value::Null).is_none());
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(Some(3.5)), Value::Number(3.5));
        assert_eq!(Value::from(None), Value::Null);
        assert_eq!(Value::from(Some(f64::NAN)), Value::Null);
    }

    #[test]
    fn test_record_get_extra() {
        let mut rec = Record::new("3944ef", "AFR123", ts(0));
        rec.extra = vec![Value::Number(250.0), Value::Text("A320".into())];
        let names = vec!["groundspeed".to_string(), "typecode".to_string()];

        assert_eq!(
            rec.get(&Column::Extra("typecode".into()), &names),
            Value::Text("A320".into())
        );
        assert_eq!(
            rec.get(&Column::Extra("squawk".into()), &names),
            Value::Null
        );
        assert_eq!(rec.get(&Column::Altitude, &names), Value::Null);
    }

    #[test]
    fn test_load_error_family() {
        assert!(FlightError::MissingColumn(COL_ICAO24).is_load_error());
        assert!(FlightError::Malformed("x".into()).is_load_error());
        assert!(!FlightError::EmptyFlight.is_load_error());
        assert!(!FlightError::InvalidKey("x".into()).is_load_error());
    }
}
