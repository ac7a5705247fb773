//! A single flight: the rows of one aircraft under one callsign with no
//! time gap above the segmentation threshold.
//!
//! Classification uses column means rather than single samples, so one
//! noisy vertical rate does not flip a flight's phase.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::{Config, Thresholds};
use crate::render::{Canvas, PathColor};
use crate::table::RecordTable;
use crate::types::*;

const EARTH_RADIUS_NM: f64 = 3440.065;

/// Great-circle distance in nautical miles.
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_NM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Coarse flight phase derived from column means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPhase {
    Level,
    Climbing,
    Descending,
    Overflight,
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightPhase::Level => write!(f, "level"),
            FlightPhase::Climbing => write!(f, "climbing"),
            FlightPhase::Descending => write!(f, "descending"),
            FlightPhase::Overflight => write!(f, "overflight"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    table: RecordTable,
}

impl Flight {
    pub fn new(table: RecordTable) -> Self {
        Flight { table }
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    pub fn rows(&self) -> &[Record] {
        self.table.rows()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    // -- Aggregates ---------------------------------------------------------

    /// Minimum of a named column, nulls skipped.
    pub fn min(&self, column: &str) -> Result<Value> {
        let col = self.table.column(column)?;
        self.table.min(&col).ok_or(FlightError::EmptyFlight)
    }

    /// Maximum of a named column, nulls skipped.
    pub fn max(&self, column: &str) -> Result<Value> {
        let col = self.table.column(column)?;
        self.table.max(&col).ok_or(FlightError::EmptyFlight)
    }

    /// Mean of a named numeric column; `None` when it holds no numbers.
    pub fn mean(&self, column: &str) -> Result<Option<f64>> {
        let col = self.table.column(column)?;
        Ok(self.table.mean(&col))
    }

    pub fn icao24(&self) -> Option<&str> {
        self.table.first().map(|r| r.icao24.as_str())
    }

    pub fn callsign(&self) -> Option<&str> {
        self.table.first().map(|r| r.callsign.as_str())
    }

    /// Earliest timestamp.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.table.time_span().map(|(lo, _)| lo)
    }

    /// Latest timestamp.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.table.time_span().map(|(_, hi)| hi)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.table.time_span().map(|(lo, hi)| hi - lo)
    }

    /// Positioned samples as `(longitude, latitude)`, in row order.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.table
            .iter()
            .filter_map(|r| match (r.latitude, r.longitude) {
                (Some(lat), Some(lon)) => Some((lon, lat)),
                _ => None,
            })
            .collect()
    }

    /// Length of the positioned track in nautical miles.
    pub fn track_length_nm(&self) -> f64 {
        self.points()
            .windows(2)
            .map(|w| haversine_nm(w[0].1, w[0].0, w[1].1, w[1].0))
            .sum()
    }

    // -- Ordering -----------------------------------------------------------

    /// True when this flight starts strictly earlier than `other`.
    /// A flight without rows sorts before every other flight.
    pub fn is_before(&self, other: &Flight) -> bool {
        self.start() < other.start()
    }

    pub fn cmp_chronological(&self, other: &Flight) -> Ordering {
        self.start().cmp(&other.start())
    }

    // -- Classification -----------------------------------------------------

    pub fn is_climbing(&self, thresholds: &Thresholds) -> bool {
        self.table
            .mean(&Column::VerticalRate)
            .is_some_and(|m| m > thresholds.climb_rate)
    }

    pub fn is_descending(&self, thresholds: &Thresholds) -> bool {
        self.table
            .mean(&Column::VerticalRate)
            .is_some_and(|m| m < -thresholds.descent_rate)
    }

    /// Cruising at high altitude; such flights are not drawn.
    pub fn is_overflight(&self, thresholds: &Thresholds) -> bool {
        self.table
            .mean(&Column::Altitude)
            .is_some_and(|m| m > thresholds.overflight_altitude)
    }

    pub fn phase(&self, thresholds: &Thresholds) -> FlightPhase {
        if self.is_overflight(thresholds) {
            return FlightPhase::Overflight;
        }
        match self.path_color(thresholds) {
            PathColor::Arrival => FlightPhase::Descending,
            PathColor::Departure => FlightPhase::Climbing,
            PathColor::Default => FlightPhase::Level,
        }
    }

    /// Palette entry for this flight. Descending is checked last and wins.
    pub fn path_color(&self, thresholds: &Thresholds) -> PathColor {
        let mut color = PathColor::Default;
        if self.is_climbing(thresholds) {
            color = PathColor::Departure;
        }
        if self.is_descending(thresholds) {
            color = PathColor::Arrival;
        }
        color
    }

    // -- Rendering ----------------------------------------------------------

    /// Draw the trajectory on `canvas`. Returns whether a path was drawn.
    pub fn render<C: Canvas + ?Sized>(&self, canvas: &mut C, config: &Config) -> bool {
        let thresholds = &config.classification;
        if self.is_overflight(thresholds) {
            tracing::debug!("skipping overflight {}", self);
            return false;
        }
        let points = self.points();
        if points.is_empty() {
            tracing::debug!("no positions to draw for {}", self);
            return false;
        }
        let style = self.path_color(thresholds).style(&config.render);
        canvas.draw_path(&points, &style);
        true
    }
}

/// Stable chronological sort: flights starting together keep input order.
pub fn sort_chronologically(flights: &mut [Flight]) {
    flights.sort_by(|a, b| a.cmp_chronological(b));
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table.first() {
            Some(r) => write!(
                f,
                "Flight {} (icao24 {}) on {}",
                r.callsign,
                r.icao24,
                r.timestamp.date_naive()
            ),
            None => write!(f, "Flight with no records"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingCanvas;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_527_638_400 + secs, 0).unwrap()
    }

    fn flight_with(rates: &[f64], altitude: f64) -> Flight {
        Flight::new(RecordTable::from_records(
            rates
                .iter()
                .enumerate()
                .map(|(i, &vr)| {
                    Record::new("3944ef", "AFR123", ts(i as i64 * 10))
                        .with_position(48.0 + i as f64 * 0.01, 2.0)
                        .with_altitude(altitude)
                        .with_vertical_rate(vr)
                })
                .collect(),
        ))
    }

    fn starting_at(secs: i64, callsign: &str) -> Flight {
        Flight::new(RecordTable::from_records(vec![
            Record::new("3944ef", callsign, ts(secs + 5)),
            Record::new("3944ef", callsign, ts(secs)),
        ]))
    }

    #[test]
    fn test_classification_climbing() {
        let t = Thresholds::default();
        let f = flight_with(&[400.0, 800.0, 600.0], 5000.0);
        assert!(f.is_climbing(&t));
        assert!(!f.is_descending(&t));
        assert_eq!(f.phase(&t), FlightPhase::Climbing);
    }

    #[test]
    fn test_classification_descending() {
        let t = Thresholds::default();
        let f = flight_with(&[-600.0], 5000.0);
        assert!(!f.is_climbing(&t));
        assert!(f.is_descending(&t));
        assert_eq!(f.phase(&t), FlightPhase::Descending);
    }

    #[test]
    fn test_classification_level() {
        let t = Thresholds::default();
        let f = flight_with(&[-300.0, 300.0], 5000.0);
        assert!(!f.is_climbing(&t));
        assert!(!f.is_descending(&t));
        assert_eq!(f.phase(&t), FlightPhase::Level);
    }

    #[test]
    fn test_classification_boundaries_are_strict() {
        let t = Thresholds::default();
        assert!(!flight_with(&[500.0], 5000.0).is_climbing(&t));
        assert!(!flight_with(&[-500.0], 5000.0).is_descending(&t));
        assert!(!flight_with(&[0.0], 19000.0).is_overflight(&t));
        assert!(flight_with(&[0.0], 19000.5).is_overflight(&t));
    }

    #[test]
    fn test_classification_without_data() {
        let t = Thresholds::default();
        let f = Flight::new(RecordTable::from_records(vec![Record::new(
            "3944ef",
            "AFR123",
            ts(0),
        )]));
        assert_eq!(f.phase(&t), FlightPhase::Level);
    }

    #[test]
    fn test_descending_color_wins_over_climbing() {
        let t = Thresholds {
            climb_rate: -1000.0,
            descent_rate: 100.0,
            overflight_altitude: 19000.0,
        };
        let f = flight_with(&[-600.0], 5000.0);
        assert!(f.is_climbing(&t));
        assert!(f.is_descending(&t));
        assert_eq!(f.path_color(&t), PathColor::Arrival);
    }

    #[test]
    fn test_render_colors() {
        let config = Config::default();

        let mut canvas = RecordingCanvas::default();
        assert!(flight_with(&[900.0, 900.0], 4000.0).render(&mut canvas, &config));
        assert!(flight_with(&[-900.0], 4000.0).render(&mut canvas, &config));
        assert!(flight_with(&[0.0], 4000.0).render(&mut canvas, &config));

        let colors: Vec<&str> = canvas.paths.iter().map(|(_, s)| s.color.as_str()).collect();
        assert_eq!(colors, vec!["firebrick", "darkgreen", "lavenderblush"]);
        assert_eq!(canvas.paths[0].0.len(), 2);
        assert_eq!(canvas.paths[0].0[0], (2.0, 48.0));
        assert_eq!(canvas.paths[0].1.alpha, 0.5);
    }

    #[test]
    fn test_render_skips_overflight() {
        let mut canvas = RecordingCanvas::default();
        let f = flight_with(&[-900.0], 35000.0);
        assert!(!f.render(&mut canvas, &Config::default()));
        assert!(canvas.paths.is_empty());
    }

    #[test]
    fn test_render_skips_unpositioned_rows() {
        let mut rows = vec![
            Record::new("3944ef", "AFR123", ts(0)).with_position(48.0, 2.0),
            Record::new("3944ef", "AFR123", ts(10)),
            Record::new("3944ef", "AFR123", ts(20)).with_position(48.1, 2.1),
        ];
        rows[1].latitude = Some(48.05);
        let f = Flight::new(RecordTable::from_records(rows));

        let mut canvas = RecordingCanvas::default();
        assert!(f.render(&mut canvas, &Config::default()));
        assert_eq!(canvas.paths[0].0.len(), 2);
    }

    #[test]
    fn test_min_max() {
        let f = flight_with(&[100.0, -50.0, 300.0], 5000.0);
        assert_eq!(f.min("timestamp").unwrap(), Value::Time(ts(0)));
        assert_eq!(f.max("timestamp").unwrap(), Value::Time(ts(20)));
        assert_eq!(f.min("vertical_rate").unwrap(), Value::Number(-50.0));
        assert_eq!(f.max("vertical_rate").unwrap(), Value::Number(300.0));
    }

    #[test]
    fn test_min_unknown_column() {
        let f = flight_with(&[0.0], 5000.0);
        assert!(matches!(
            f.min("squawk"),
            Err(FlightError::ColumnNotFound(c)) if c == "squawk"
        ));
    }

    #[test]
    fn test_min_empty_flight() {
        let f = Flight::new(RecordTable::default());
        assert!(matches!(f.min("altitude"), Err(FlightError::EmptyFlight)));
        assert!(matches!(f.max("timestamp"), Err(FlightError::EmptyFlight)));
        assert_eq!(f.callsign(), None);
        assert_eq!(f.to_string(), "Flight with no records");
    }

    #[test]
    fn test_identity_accessors() {
        let f = flight_with(&[0.0], 5000.0);
        assert_eq!(f.icao24(), Some("3944ef"));
        assert_eq!(f.callsign(), Some("AFR123"));
        assert_eq!(f.to_string(), "Flight AFR123 (icao24 3944ef) on 2018-05-30");
    }

    #[test]
    fn test_ordering_uses_min_timestamp() {
        let a = starting_at(100, "A");
        let b = starting_at(200, "B");
        assert!(a.is_before(&b));
        assert!(!b.is_before(&a));
        assert!(!a.is_before(&a.clone()));
        assert_eq!(a.start(), Some(ts(100)));
    }

    #[test]
    fn test_sort_is_stable() {
        let mut flights = vec![
            starting_at(300, "C"),
            starting_at(100, "A1"),
            starting_at(200, "B"),
            starting_at(100, "A2"),
        ];
        sort_chronologically(&mut flights);
        let order: Vec<&str> = flights.iter().map(|f| f.callsign().unwrap()).collect();
        assert_eq!(order, vec!["A1", "A2", "B", "C"]);
    }

    #[test]
    fn test_duration_and_track_length() {
        let f = flight_with(&[0.0, 0.0, 0.0], 5000.0);
        assert_eq!(f.duration(), Some(Duration::seconds(20)));
        // 0.02 degrees of latitude is 1.2 nm
        assert!((f.track_length_nm() - 1.2).abs() < 0.01);
    }

    #[test]
    fn test_haversine() {
        // KJFK to KLAX, roughly 2145 nm
        let d = haversine_nm(40.6413, -73.7781, 33.9416, -118.4085);
        assert!((d - 2145.0).abs() < 10.0);
    }
}
