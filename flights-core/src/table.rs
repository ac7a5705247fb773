//! In-memory record table: the small dataframe the rest of the crate is
//! built on.
//!
//! Every operation returns a new owned table and keeps source row order.
//! Extra (non-required) column names are shared between a table and the
//! sub-tables derived from it.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::grouping::Groups;
use crate::types::*;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    rows: Vec<Record>,
    extra_columns: Arc<Vec<String>>,
}

impl RecordTable {
    /// Build a table from records, numbering them `0..n` in the given order.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self::with_extra_columns(records, Vec::new())
    }

    /// Like `from_records`, with extra column names matching each record's
    /// `extra` slots.
    pub fn with_extra_columns(mut records: Vec<Record>, extra_columns: Vec<String>) -> Self {
        for (i, rec) in records.iter_mut().enumerate() {
            rec.index = i;
        }
        RecordTable {
            rows: records,
            extra_columns: Arc::new(extra_columns),
        }
    }

    /// Derive a table over already-indexed rows, sharing our column names.
    fn derive(&self, rows: Vec<Record>) -> Self {
        RecordTable {
            rows,
            extra_columns: Arc::clone(&self.extra_columns),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    pub fn first(&self) -> Option<&Record> {
        self.rows.first()
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    /// All column names: required columns first, then extras.
    pub fn columns(&self) -> Vec<&str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .chain(self.extra_columns.iter().map(String::as_str))
            .collect()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        REQUIRED_COLUMNS.len() + self.extra_columns.len()
    }

    /// Resolve a column name against this table's schema.
    pub fn column(&self, name: &str) -> Result<Column> {
        if let Some(col) = Column::required(name) {
            return Ok(col);
        }
        if self.extra_columns.iter().any(|c| c == name) {
            return Ok(Column::Extra(name.to_string()));
        }
        Err(FlightError::ColumnNotFound(name.to_string()))
    }

    /// Keep rows matching `pred`.
    pub fn filter<F>(&self, pred: F) -> RecordTable
    where
        F: Fn(&Record) -> bool,
    {
        self.derive(self.rows.iter().filter(|r| pred(r)).cloned().collect())
    }

    /// Rows at the given positions, in the order given.
    pub fn select(&self, positions: &[usize]) -> RecordTable {
        self.derive(
            positions
                .iter()
                .filter_map(|&i| self.rows.get(i))
                .cloned()
                .collect(),
        )
    }

    /// Rows in a positional range. Out-of-bounds ends are clamped.
    pub fn slice(&self, range: Range<usize>) -> RecordTable {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        self.derive(self.rows[start..end].to_vec())
    }

    /// Group rows by `key`. Groups come out in ascending key order and keep
    /// source row order inside each group.
    pub fn group_by<K, F>(&self, key: F) -> Groups<'_>
    where
        K: Ord,
        F: Fn(&Record) -> K,
    {
        let mut buckets: BTreeMap<K, Vec<usize>> = BTreeMap::new();
        for (pos, rec) in self.rows.iter().enumerate() {
            buckets.entry(key(rec)).or_default().push(pos);
        }
        Groups::new(self, buckets.into_values().collect())
    }

    // -- Aggregates ---------------------------------------------------------

    fn values<'a>(&'a self, column: &'a Column) -> impl Iterator<Item = Value> + 'a {
        self.rows
            .iter()
            .map(move |r| r.get(column, &self.extra_columns))
            .filter(|v| !v.is_null())
    }

    /// Smallest non-null value, or `None` when the table is empty.
    /// An all-null column yields `Some(Value::Null)`.
    pub fn min(&self, column: &Column) -> Option<Value> {
        self.extreme(column, std::cmp::Ordering::Less)
    }

    /// Largest non-null value; see `min`.
    pub fn max(&self, column: &Column) -> Option<Value> {
        self.extreme(column, std::cmp::Ordering::Greater)
    }

    fn extreme(&self, column: &Column, wanted: std::cmp::Ordering) -> Option<Value> {
        if self.rows.is_empty() {
            return None;
        }
        let best = self.values(column).fold(None::<Value>, |best, v| match best {
            None => Some(v),
            Some(b) => {
                if v.compare(&b) == Some(wanted) {
                    Some(v)
                } else {
                    Some(b)
                }
            }
        });
        Some(best.unwrap_or(Value::Null))
    }

    /// Mean of the non-null numeric cells of a column.
    pub fn mean(&self, column: &Column) -> Option<f64> {
        let (sum, count) = self
            .values(column)
            .filter_map(|v| v.as_number())
            .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    pub fn contains_callsign(&self, callsign: &str) -> bool {
        self.rows.iter().any(|r| r.callsign == callsign)
    }

    pub fn contains_icao24(&self, icao24: &str) -> bool {
        self.rows.iter().any(|r| r.icao24 == icao24)
    }

    /// Earliest and latest timestamp.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.rows.first()?.timestamp;
        Some(self.rows.iter().fold((first, first), |(lo, hi), r| {
            (lo.min(r.timestamp), hi.max(r.timestamp))
        }))
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
