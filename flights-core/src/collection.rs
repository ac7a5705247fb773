//! A multi-flight record table with iteration, counting, and lookup.
//!
//! The collection stores rows only. Flights are re-derived by
//! `segment_all` on every `iter()`/`len()`, so `len()` costs a full
//! segmentation pass.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};

use crate::config::DEFAULT_GAP_SECS;
use crate::flight::Flight;
use crate::grouping::by_callsign;
use crate::load::read_json_file;
use crate::segment::{segment_all, Segments};
use crate::table::RecordTable;
use crate::types::*;

/// What a lookup may be keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    /// A callsign or an icao24 address, tried in that order.
    Text(String),
    /// Start of a one-day window.
    Time(DateTime<Utc>),
}

impl From<&str> for LookupKey {
    fn from(s: &str) -> Self {
        LookupKey::Text(s.to_string())
    }
}

impl From<String> for LookupKey {
    fn from(s: String) -> Self {
        LookupKey::Text(s)
    }
}

impl From<DateTime<Utc>> for LookupKey {
    fn from(t: DateTime<Utc>) -> Self {
        LookupKey::Time(t)
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Text(s) => write!(f, "{s:?}"),
            LookupKey::Time(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// Outcome of a lookup.
///
/// A filter that matches zero or one flight collapses to `SingleFlight`
/// over all matching rows, so `SingleFlight` may hold an empty flight.
#[derive(Debug, Clone)]
pub enum LookupResult {
    SingleFlight(Flight),
    MultipleFlights(FlightCollection),
}

impl LookupResult {
    pub fn flight(&self) -> Option<&Flight> {
        match self {
            LookupResult::SingleFlight(f) => Some(f),
            LookupResult::MultipleFlights(_) => None,
        }
    }

    pub fn collection(&self) -> Option<&FlightCollection> {
        match self {
            LookupResult::SingleFlight(_) => None,
            LookupResult::MultipleFlights(c) => Some(c),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlightCollection {
    table: RecordTable,
    gap_secs: f64,
}

impl FlightCollection {
    pub fn new(table: RecordTable) -> Self {
        FlightCollection {
            table,
            gap_secs: DEFAULT_GAP_SECS,
        }
    }

    /// Use a different segmentation gap.
    pub fn with_gap(mut self, gap_secs: f64) -> Self {
        self.gap_secs = gap_secs;
        self
    }

    /// Load a JSON record document.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(read_json_file(path.as_ref())?))
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    pub fn gap_secs(&self) -> f64 {
        self.gap_secs
    }

    /// Number of flights. Runs a full segmentation on every call.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn iter(&self) -> Segments<'_> {
        segment_all(&self.table, self.gap_secs)
    }

    /// One sub-collection per callsign, for display grouping.
    pub fn by_callsign(&self) -> impl Iterator<Item = FlightCollection> + '_ {
        by_callsign(&self.table).map(move |t| self.derive(t))
    }

    fn derive(&self, table: RecordTable) -> FlightCollection {
        FlightCollection {
            table,
            gap_secs: self.gap_secs,
        }
    }

    /// Find flights by callsign, then icao24, then a one-day window
    /// `[key, key + 1 day)` starting at a time key.
    pub fn lookup(&self, key: impl Into<LookupKey>) -> Result<LookupResult> {
        let key = key.into();
        let filtered = match &key {
            LookupKey::Text(s) if self.table.contains_callsign(s) => {
                tracing::debug!(callsign = %s, "lookup by callsign");
                self.table.filter(|r| r.callsign == *s)
            }
            LookupKey::Text(s) if self.table.contains_icao24(s) => {
                tracing::debug!(icao24 = %s, "lookup by icao24");
                self.table.filter(|r| r.icao24 == *s)
            }
            LookupKey::Time(start) => {
                let end = *start + Duration::days(1);
                tracing::debug!(%start, %end, "lookup by day window");
                self.table
                    .filter(|r| r.timestamp >= *start && r.timestamp < end)
            }
            LookupKey::Text(s) => return Err(FlightError::InvalidKey(s.clone())),
        };

        let found = self.derive(filtered);
        // Stop after two flights: that's enough to decide the shape.
        if found.iter().take(2).count() > 1 {
            return Ok(LookupResult::MultipleFlights(found));
        }
        if found.table.is_empty() {
            tracing::warn!("lookup {key} matched no rows, returning an empty flight");
        }
        Ok(LookupResult::SingleFlight(Flight::new(found.table)))
    }
}

impl<'a> IntoIterator for &'a FlightCollection {
    type Item = Flight;
    type IntoIter = Segments<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for FlightCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FlightCollection with {} records of {} values",
            self.table.len(),
            self.table.width()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const T0: i64 = 1_527_638_400; // 2018-05-30T00:00:00Z

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(T0 + secs, 0).unwrap()
    }

    fn rec(icao24: &str, callsign: &str, secs: i64) -> Record {
        Record::new(icao24, callsign, ts(secs))
    }

    /// AFR123 flown twice by 3944ef with a 40000 s break, plus KLM1023.
    fn two_afr_flights() -> FlightCollection {
        FlightCollection::new(RecordTable::from_records(vec![
            rec("3944ef", "AFR123", 36_000),
            rec("3944ef", "AFR123", 36_060),
            rec("4840d6", "KLM1023", 36_100),
            rec("3944ef", "AFR123", 76_060),
            rec("3944ef", "AFR123", 76_120),
        ]))
    }

    fn one_afr_flight() -> FlightCollection {
        FlightCollection::new(RecordTable::from_records(vec![
            rec("3944ef", "AFR123", 0),
            rec("4840d6", "KLM1023", 30),
            rec("3944ef", "AFR123", 250),
            rec("3944ef", "AFR123", 500),
        ]))
    }

    #[test]
    fn test_len_and_iter_agree() {
        let c = two_afr_flights();
        assert_eq!(c.len(), 3);
        assert_eq!(c.iter().count(), 3);
        assert_eq!((&c).into_iter().count(), 3);
        assert!(!c.is_empty());
        assert!(FlightCollection::new(RecordTable::default()).is_empty());
    }

    #[test]
    fn test_with_gap() {
        let c = two_afr_flights().with_gap(f64::INFINITY);
        assert_eq!(c.len(), 2);
        assert_eq!(two_afr_flights().with_gap(30.0).len(), 5);
    }

    #[test]
    fn test_lookup_callsign_multiple_flights() {
        let c = two_afr_flights();
        match c.lookup("AFR123").unwrap() {
            LookupResult::MultipleFlights(found) => {
                assert_eq!(found.len(), 2);
                assert!(found.iter().all(|f| f.callsign() == Some("AFR123")));
            }
            LookupResult::SingleFlight(_) => panic!("expected two flights"),
        }
    }

    #[test]
    fn test_lookup_callsign_single_flight() {
        let c = one_afr_flight();
        match c.lookup("AFR123").unwrap() {
            LookupResult::SingleFlight(flight) => {
                assert_eq!(flight.len(), 3);
                assert_eq!(flight.min("timestamp").unwrap(), Value::Time(ts(0)));
                assert_eq!(flight.max("timestamp").unwrap(), Value::Time(ts(500)));
            }
            LookupResult::MultipleFlights(_) => panic!("expected one flight"),
        }
    }

    #[test]
    fn test_lookup_icao24() {
        let c = two_afr_flights();
        let result = c.lookup("4840d6").unwrap();
        let flight = result.flight().expect("single flight");
        assert_eq!(flight.callsign(), Some("KLM1023"));
        assert!(result.collection().is_none());
    }

    #[test]
    fn test_callsign_takes_precedence_over_icao24() {
        let c = FlightCollection::new(RecordTable::from_records(vec![
            rec("abc123", "XYZ", 0),
            rec("def456", "abc123", 10),
        ]));
        let result = c.lookup("abc123").unwrap();
        assert_eq!(result.flight().unwrap().icao24(), Some("def456"));
    }

    #[test]
    fn test_lookup_day_window() {
        let c = two_afr_flights();
        match c.lookup(ts(0)).unwrap() {
            LookupResult::MultipleFlights(found) => {
                assert_eq!(found.table().len(), 5);
                assert_eq!(found.len(), 3);
            }
            LookupResult::SingleFlight(_) => panic!("expected two flights"),
        }

        let second_day = c.lookup(ts(86_400)).unwrap();
        assert_eq!(second_day.flight().unwrap().len(), 0);
    }

    #[test]
    fn test_lookup_day_window_is_half_open() {
        let c = FlightCollection::new(RecordTable::from_records(vec![
            rec("3944ef", "AFR123", 0),
            rec("4840d6", "KLM1023", 86_400),
        ]));
        let result = c.lookup(ts(0)).unwrap();
        let flight = result.flight().expect("start included, end excluded");
        assert_eq!(flight.callsign(), Some("AFR123"));
    }

    #[test]
    fn test_lookup_timestamp_without_rows_is_empty_flight() {
        let c = one_afr_flight();
        let result = c.lookup(ts(-10 * 86_400)).unwrap();
        let flight = result.flight().expect("degenerate collapse");
        assert!(flight.is_empty());
        assert!(matches!(flight.min("timestamp"), Err(FlightError::EmptyFlight)));
    }

    #[test]
    fn test_lookup_unknown_text_is_invalid() {
        let c = one_afr_flight();
        assert!(matches!(
            c.lookup("BAW1"),
            Err(FlightError::InvalidKey(k)) if k == "BAW1"
        ));
    }

    #[test]
    fn test_lookup_keeps_gap() {
        let c = two_afr_flights().with_gap(f64::INFINITY);
        let result = c.lookup("AFR123").unwrap();
        assert_eq!(result.flight().unwrap().len(), 4);
    }

    #[test]
    fn test_by_callsign_groups() {
        let c = FlightCollection::new(RecordTable::from_records(vec![
            rec("3944ef", "AFR123", 0),
            rec("a1b2c3", "AFR123", 0),
            rec("4840d6", "KLM1023", 0),
        ]));
        let groups: Vec<FlightCollection> = c.by_callsign().collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn test_display() {
        let c = one_afr_flight();
        assert_eq!(c.to_string(), "FlightCollection with 4 records of 7 values");
    }
}
