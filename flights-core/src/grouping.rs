//! Lazy partitions of a record table: by identity, by callsign, and by
//! time gap.
//!
//! Group membership is computed up front as row positions; each sub-table
//! is only copied out when the caller pulls it.

use crate::table::RecordTable;
use crate::types::Record;

// ---------------------------------------------------------------------------
// Key groups
// ---------------------------------------------------------------------------

/// Iterator over the sub-tables of a `RecordTable::group_by`.
pub struct Groups<'a> {
    table: &'a RecordTable,
    groups: std::vec::IntoIter<Vec<usize>>,
}

impl<'a> Groups<'a> {
    pub(crate) fn new(table: &'a RecordTable, groups: Vec<Vec<usize>>) -> Self {
        Groups {
            table,
            groups: groups.into_iter(),
        }
    }
}

impl Iterator for Groups<'_> {
    type Item = RecordTable;

    fn next(&mut self) -> Option<RecordTable> {
        self.groups.next().map(|positions| self.table.select(&positions))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.groups.size_hint()
    }
}

impl ExactSizeIterator for Groups<'_> {}

/// Partition by (callsign, icao24): one group per aircraft flying under one
/// callsign. A group may still hold several consecutive flights.
pub fn by_identity(table: &RecordTable) -> Groups<'_> {
    table.group_by(|r| (r.callsign.clone(), r.icao24.clone()))
}

/// Partition by callsign alone. Two aircraft sharing a callsign land in the
/// same group, so this is for display only, never for segmentation.
pub fn by_callsign(table: &RecordTable) -> Groups<'_> {
    table.group_by(|r| r.callsign.clone())
}

// ---------------------------------------------------------------------------
// Time-gap splits
// ---------------------------------------------------------------------------

/// Seconds from `a` to `b` (negative when `b` is earlier).
pub fn gap_secs(a: &Record, b: &Record) -> f64 {
    let delta = b.timestamp - a.timestamp;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        // beyond ~292k years of microseconds
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Splits one identity group wherever consecutive rows are more than
/// `threshold_secs` apart.
///
/// Boundaries are row positions, so equal timestamps always stay together.
/// An input without any gap, including a single row or no rows at all,
/// comes out as exactly one sub-table.
pub struct TimeGapSplits {
    table: RecordTable,
    threshold_secs: f64,
    start: usize,
    done: bool,
}

impl Iterator for TimeGapSplits {
    type Item = RecordTable;

    fn next(&mut self) -> Option<RecordTable> {
        if self.done {
            return None;
        }
        let rows = self.table.rows();
        let split = (self.start + 1..rows.len())
            .find(|&i| gap_secs(&rows[i - 1], &rows[i]) > self.threshold_secs);

        match split {
            Some(end) => {
                let chunk = self.table.slice(self.start..end);
                self.start = end;
                Some(chunk)
            }
            None => {
                self.done = true;
                Some(self.table.slice(self.start..rows.len()))
            }
        }
    }
}

impl std::iter::FusedIterator for TimeGapSplits {}

/// Split a single identity group's rows (in timestamp order) on time gaps.
pub fn by_time_gap(table: RecordTable, threshold_secs: f64) -> TimeGapSplits {
    TimeGapSplits {
        table,
        threshold_secs,
        start: 0,
        done: false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
