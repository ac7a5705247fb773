//! flights-core: segmentation of recorded aircraft surveillance samples
//! into individual flights.
//!
//! No async, no network — records are loaded once and every query returns
//! new owned tables. The `flights` CLI in `flights-cli` is built on this
//! crate.

pub mod collection;
pub mod config;
pub mod flight;
pub mod grouping;
pub mod load;
pub mod render;
pub mod segment;
pub mod table;
pub mod types;

// Re-export commonly used types at crate root
pub use collection::{FlightCollection, LookupKey, LookupResult};
pub use config::{Config, Thresholds, DEFAULT_GAP_SECS};
pub use flight::{sort_chronologically, Flight, FlightPhase};
pub use render::{Canvas, PathStyle};
pub use segment::segment_all;
pub use table::RecordTable;
pub use types::*;
