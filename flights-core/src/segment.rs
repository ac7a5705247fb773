//! Flight segmentation: identity groups split on time gaps.
//!
//! `segment_all` is the one authoritative enumeration of the flights in a
//! table. It keeps no state between calls, so calling it again restarts
//! from the first flight.

use crate::flight::Flight;
use crate::grouping::{by_identity, by_time_gap, Groups, TimeGapSplits};
use crate::table::RecordTable;

/// Lazy stream of flights: the outer identity groups drive the inner
/// time-gap splits, one flight at a time.
pub struct Segments<'a> {
    groups: Groups<'a>,
    current: Option<TimeGapSplits>,
    threshold_secs: f64,
}

impl Iterator for Segments<'_> {
    type Item = Flight;

    fn next(&mut self) -> Option<Flight> {
        loop {
            if let Some(rows) = self.current.as_mut().and_then(Iterator::next) {
                return Some(Flight::new(rows));
            }
            let group = self.groups.next()?;
            self.current = Some(by_time_gap(group, self.threshold_secs));
        }
    }
}

impl std::iter::FusedIterator for Segments<'_> {}

/// Every flight in `table`, ordered by (callsign, icao24) and then by time
/// within each aircraft.
pub fn segment_all(table: &RecordTable, threshold_secs: f64) -> Segments<'_> {
    tracing::debug!(
        rows = table.len(),
        threshold_secs,
        "segmenting record table"
    );
    Segments {
        groups: by_identity(table),
        current: None,
        threshold_secs,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
