//! flights: CLI for segmenting and inspecting recorded flights.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flights_core::config::{self, Config};
use flights_core::load::parse_time_str;
use flights_core::{
    sort_chronologically, Flight, FlightCollection, FlightError, FlightPhase, LookupKey,
    LookupResult,
};

mod svg;

#[derive(Parser)]
#[command(name = "flights", version, about = "Flight segmentation and lookup")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Config file (defaults to ~/.flights/config.yaml)
    #[arg(long, global = true, env = "FLIGHTS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count records, flights, and flight phases in a record file
    Summary {
        /// JSON record file
        file: PathBuf,

        /// Seconds between samples that start a new flight
        #[arg(long)]
        gap: Option<f64>,
    },

    /// List every flight in chronological order
    List {
        /// JSON record file
        file: PathBuf,

        /// Seconds between samples that start a new flight
        #[arg(long)]
        gap: Option<f64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Look up flights by callsign, icao24, or day
    Lookup {
        /// JSON record file
        file: PathBuf,

        /// Callsign, icao24 address, or date/time (RFC 3339 or YYYY-MM-DD)
        key: String,

        /// Seconds between samples that start a new flight
        #[arg(long)]
        gap: Option<f64>,
    },

    /// Draw flight trajectories to an SVG file
    Render {
        /// JSON record file
        file: PathBuf,

        /// Output SVG path
        #[arg(short, long, default_value = "flights.svg")]
        output: PathBuf,

        /// Image width in pixels
        #[arg(long, default_value = "1200")]
        width: u32,

        /// Image height in pixels
        #[arg(long, default_value = "800")]
        height: u32,

        /// Seconds between samples that start a new flight
        #[arg(long)]
        gap: Option<f64>,
    },

    /// Show the effective configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    match cli.command {
        Commands::Summary { file, gap } => cmd_summary(&open(&file, gap, &config), &config),
        Commands::List { file, gap, json } => cmd_list(&open(&file, gap, &config), &config, json),
        Commands::Lookup { file, key, gap } => {
            cmd_lookup(&open(&file, gap, &config), &key, &config)
        }
        Commands::Render {
            file,
            output,
            width,
            height,
            gap,
        } => cmd_render(&open(&file, gap, &config), &output, width, height, &config),
        Commands::Config { init } => cmd_config(&config, cli.config.as_deref(), init),
    }
}

/// Load a record file or exit.
fn open(file: &Path, gap: Option<f64>, config: &Config) -> FlightCollection {
    let collection = FlightCollection::from_file(file).unwrap_or_else(|e| {
        eprintln!("Error loading {}: {e}", file.display());
        std::process::exit(1);
    });
    let gap_secs = gap.unwrap_or(config.segmentation.gap_secs);
    tracing::info!(
        records = collection.table().len(),
        gap_secs,
        "opened {}",
        file.display()
    );
    collection.with_gap(gap_secs)
}

fn cmd_summary(collection: &FlightCollection, config: &Config) {
    let thresholds = &config.classification;
    let mut counts = [0usize; 4];
    let mut total = 0usize;
    for flight in collection {
        total += 1;
        let slot = match flight.phase(thresholds) {
            FlightPhase::Level => 0,
            FlightPhase::Climbing => 1,
            FlightPhase::Descending => 2,
            FlightPhase::Overflight => 3,
        };
        counts[slot] += 1;
    }

    println!();
    println!("{collection}");
    println!(
        "Flights: {total} (gap {} s)",
        format_gap(collection.gap_secs())
    );
    println!();
    println!("  Level:       {}", counts[0]);
    println!("  Climbing:    {}", counts[1]);
    println!("  Descending:  {}", counts[2]);
    println!("  Overflight:  {}", counts[3]);
    if let Some((start, end)) = collection.table().time_span() {
        println!();
        println!("  From: {}", format_time(start));
        println!("  To:   {}", format_time(end));
    }
    println!();
}

/// One line of `list` output.
#[derive(Serialize)]
struct FlightRow {
    callsign: String,
    icao24: String,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    duration_secs: Option<i64>,
    rows: usize,
    max_altitude: Option<f64>,
    track_nm: f64,
    phase: FlightPhase,
}

impl FlightRow {
    fn new(flight: &Flight, config: &Config) -> flights_core::Result<Self> {
        let max_altitude = if flight.is_empty() {
            None
        } else {
            flight.max("altitude")?.as_number()
        };
        Ok(FlightRow {
            callsign: flight.callsign().unwrap_or_default().to_string(),
            icao24: flight.icao24().unwrap_or_default().to_string(),
            start: flight.start(),
            end: flight.end(),
            duration_secs: flight.duration().map(|d| d.num_seconds()),
            rows: flight.len(),
            max_altitude,
            track_nm: flight.track_length_nm(),
            phase: flight.phase(&config.classification),
        })
    }
}

/// Rows for `flights` in chronological order, exiting on an aggregate error.
fn flight_rows(mut flights: Vec<Flight>, config: &Config) -> Vec<FlightRow> {
    sort_chronologically(&mut flights);
    flights
        .iter()
        .map(|f| FlightRow::new(f, config))
        .collect::<flights_core::Result<Vec<_>>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        })
}

fn cmd_list(collection: &FlightCollection, config: &Config, json: bool) {
    let rows = flight_rows(collection.iter().collect(), config);

    if json {
        match serde_json::to_string_pretty(&rows) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!();
    println!("{} flights", rows.len());
    println!();
    if !rows.is_empty() {
        println!("{}", flight_table(&rows));
    }
}

fn flight_table(rows: &[FlightRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Callsign", "ICAO", "Start", "End", "Duration", "Rows", "Max alt (ft)", "Track (nm)",
        "Phase",
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(dash_if_empty(&row.callsign)),
            Cell::new(dash_if_empty(&row.icao24)),
            Cell::new(row.start.map(format_time).unwrap_or("-".into())),
            Cell::new(row.end.map(format_time).unwrap_or("-".into())),
            Cell::new(
                row.duration_secs
                    .map(format_duration)
                    .unwrap_or("-".into()),
            ),
            Cell::new(row.rows),
            Cell::new(
                row.max_altitude
                    .map(|a| format!("{a:.0}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(format!("{:.1}", row.track_nm)),
            Cell::new(row.phase),
        ]);
    }
    table
}

fn cmd_lookup(collection: &FlightCollection, key: &str, config: &Config) {
    let result = match collection.lookup(key) {
        // Not a callsign or icao24: try it as a day
        Err(FlightError::InvalidKey(_)) => match parse_time_str(key) {
            Some(start) => collection.lookup(LookupKey::Time(start)),
            None => Err(FlightError::InvalidKey(key.to_string())),
        },
        other => other,
    };

    match result {
        Ok(LookupResult::SingleFlight(flight)) => {
            if let Err(e) = print_flight(&flight, config) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        Ok(LookupResult::MultipleFlights(found)) => {
            let rows = flight_rows(found.iter().collect(), config);
            println!();
            println!("{} flights match {key}", rows.len());
            println!();
            println!("{}", flight_table(&rows));
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_flight(flight: &Flight, config: &Config) -> flights_core::Result<()> {
    println!();
    println!("{flight}");
    if flight.is_empty() {
        println!();
        return Ok(());
    }
    let thresholds = &config.classification;
    println!();
    println!("  Rows:        {}", flight.len());
    if let (Some(start), Some(end)) = (flight.start(), flight.end()) {
        println!("  Start:       {}", format_time(start));
        println!("  End:         {}", format_time(end));
    }
    for column in ["altitude", "vertical_rate"] {
        let min = flight.min(column)?;
        let max = flight.max(column)?;
        println!("  {column:<13}{min} .. {max}");
    }
    println!("  Track:       {:.1} nm", flight.track_length_nm());
    println!("  Phase:       {}", flight.phase(thresholds));
    println!();
    Ok(())
}

fn cmd_render(
    collection: &FlightCollection,
    output: &Path,
    width: u32,
    height: u32,
    config: &Config,
) {
    let positions = collection
        .table()
        .iter()
        .filter_map(|r| Some((r.longitude?, r.latitude?)));
    let Some(bounds) = svg::Bounds::around(positions) else {
        eprintln!("No positioned records to draw");
        std::process::exit(1);
    };

    let mut canvas = svg::SvgCanvas::new(width, height, bounds);
    let mut skipped = 0usize;
    for flight in collection {
        if !flight.render(&mut canvas, config) {
            skipped += 1;
        }
    }

    if let Err(e) = std::fs::write(output, canvas.finish()) {
        eprintln!("Error writing {}: {e}", output.display());
        std::process::exit(1);
    }
    println!(
        "Wrote {}: {} flights drawn, {} skipped",
        output.display(),
        canvas.path_count(),
        skipped
    );
}

fn cmd_config(config: &Config, path: Option<&Path>, init: bool) {
    if init {
        let written = match path {
            Some(p) => config::save_config_to(&Config::default(), p).map(|_| p.to_path_buf()),
            None => config::save_config(&Config::default()),
        };
        match written {
            Ok(p) => println!("Wrote {}", p.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!();
    println!("Segmentation");
    println!("  gap_seconds:          {}", format_gap(config.segmentation.gap_secs));
    println!("Classification");
    println!("  climb_rate:           {}", config.classification.climb_rate);
    println!("  descent_rate:         {}", config.classification.descent_rate);
    println!(
        "  overflight_altitude:  {}",
        config.classification.overflight_altitude
    );
    println!("Render");
    println!("  default_color:        {}", config.render.default_color);
    println!("  departure_color:      {}", config.render.departure_color);
    println!("  arrival_color:        {}", config.render.arrival_color);
    println!("  alpha:                {}", config.render.alpha);
    println!();
}

fn format_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn format_duration(secs: i64) -> String {
    format!("{}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn format_gap(gap: f64) -> String {
    if gap.is_infinite() {
        "unbounded".into()
    } else {
        format!("{gap}")
    }
}

fn dash_if_empty(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0h00m00s");
        assert_eq!(format_duration(3725), "1h02m05s");
    }

    #[test]
    fn test_format_gap() {
        assert_eq!(format_gap(20000.0), "20000");
        assert_eq!(format_gap(f64::INFINITY), "unbounded");
    }

    #[test]
    fn test_cli_parses_lookup() {
        let cli = Cli::try_parse_from(["flights", "lookup", "data.json", "AFR123", "--gap", "60"])
            .unwrap();
        match cli.command {
            Commands::Lookup { key, gap, .. } => {
                assert_eq!(key, "AFR123");
                assert_eq!(gap, Some(60.0));
            }
            _ => panic!("expected lookup"),
        }
    }

    #[test]
    fn test_open_applies_gap() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
            {{"icao24": "3944ef", "callsign": "AFR123", "timestamp": 0,
             "latitude": null, "longitude": null, "altitude": null, "vertical_rate": null}},
            {{"icao24": "3944ef", "callsign": "AFR123", "timestamp": 600,
             "latitude": null, "longitude": null, "altitude": null, "vertical_rate": null}}
        ]"#
        )
        .unwrap();

        let config = Config::default();
        assert_eq!(open(file.path(), None, &config).len(), 1);
        assert_eq!(open(file.path(), Some(60.0), &config).len(), 2);
    }

    #[test]
    fn test_flight_row_from_flight() {
        let records = r#"[
            {"icao24": "3944ef", "callsign": "AFR123", "timestamp": "2018-05-30T10:00:00Z",
             "latitude": 48.7, "longitude": 2.3, "altitude": 3000, "vertical_rate": 1200},
            {"icao24": "3944ef", "callsign": "AFR123", "timestamp": "2018-05-30T10:01:00Z",
             "latitude": 48.8, "longitude": 2.3, "altitude": 4200, "vertical_rate": 1200}
        ]"#;
        let table = flights_core::load::parse_json(records).unwrap();
        let flight = Flight::new(table);
        let row = FlightRow::new(&flight, &Config::default()).unwrap();
        assert_eq!(row.callsign, "AFR123");
        assert_eq!(row.duration_secs, Some(60));
        assert_eq!(row.max_altitude, Some(4200.0));
        assert_eq!(row.phase, FlightPhase::Climbing);
        assert!((row.track_nm - 6.0).abs() < 0.05);
    }

    #[test]
    fn test_flight_row_for_empty_flight() {
        let empty = Flight::new(flights_core::RecordTable::default());
        let row = FlightRow::new(&empty, &Config::default()).unwrap();
        assert_eq!(row.rows, 0);
        assert_eq!(row.max_altitude, None);
        assert_eq!(row.start, None);
    }

    #[test]
    fn test_print_flight_propagates_aggregates() {
        let empty = Flight::new(flights_core::RecordTable::default());
        assert!(print_flight(&empty, &Config::default()).is_ok());

        let table = flights_core::load::parse_json(
            r#"[{"icao24": "3944ef", "callsign": "AFR123", "timestamp": 0,
                 "latitude": null, "longitude": null, "altitude": null, "vertical_rate": null}]"#,
        )
        .unwrap();
        assert!(print_flight(&Flight::new(table), &Config::default()).is_ok());
    }
}
