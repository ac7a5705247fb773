//! Configuration file management for flights.
//!
//! Reads/writes `~/.flights/config.yaml` with the segmentation gap,
//! classification thresholds, and render palette.

use std::path::{Path, PathBuf};

use crate::types::FlightError;

/// Gap between consecutive samples, in seconds, that starts a new flight.
pub const DEFAULT_GAP_SECS: f64 = 20000.0;

/// Mean vertical rate (ft/min) above which a flight is climbing.
pub const DEFAULT_CLIMB_RATE: f64 = 500.0;

/// Mean vertical rate magnitude (ft/min) beyond which a flight is descending.
pub const DEFAULT_DESCENT_RATE: f64 = 500.0;

/// Mean altitude (ft) above which a flight is a high-altitude overflight.
pub const DEFAULT_OVERFLIGHT_ALTITUDE: f64 = 19000.0;

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub segmentation: SegmentationConfig,
    pub classification: Thresholds,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationConfig {
    pub gap_secs: f64,
}

/// Classification thresholds, passed explicitly to every `Flight` check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub climb_rate: f64,
    pub descent_rate: f64,
    pub overflight_altitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub default_color: String,
    pub departure_color: String,
    pub arrival_color: String,
    pub alpha: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            segmentation: SegmentationConfig::default(),
            classification: Thresholds::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        SegmentationConfig {
            gap_secs: DEFAULT_GAP_SECS,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            climb_rate: DEFAULT_CLIMB_RATE,
            descent_rate: DEFAULT_DESCENT_RATE,
            overflight_altitude: DEFAULT_OVERFLIGHT_ALTITUDE,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            default_color: "lavenderblush".into(),
            departure_color: "firebrick".into(),
            arrival_color: "darkgreen".into(),
            alpha: 0.5,
        }
    }
}

/// Get the config directory path (`~/.flights/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".flights")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.flights/config.yaml`.
///
/// Returns default config if the file doesn't exist.
pub fn load_config() -> Config {
    load_config_from(&config_file())
}

/// Load config from an explicit path, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text),
        Err(e) => {
            tracing::warn!("cannot read {}: {e}; using defaults", path.display());
            Config::default()
        }
    }
}

/// Save config to `~/.flights/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, FlightError> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save config to an explicit path, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> Result<(), FlightError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| FlightError::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config))
        .map_err(|e| FlightError::Config(e.to_string()))
}

/// Parse simple YAML-like config text. Unknown keys are ignored and
/// unparsable values keep their defaults.
fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');
        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        let Some(section) = current_section.as_deref() else {
            continue;
        };
        match (section, key) {
            ("segmentation", "gap_seconds") => {
                set_float(&mut config.segmentation.gap_secs, val)
            }
            ("classification", "climb_rate") => {
                set_float(&mut config.classification.climb_rate, val)
            }
            ("classification", "descent_rate") => {
                set_float(&mut config.classification.descent_rate, val)
            }
            ("classification", "overflight_altitude") => {
                set_float(&mut config.classification.overflight_altitude, val)
            }
            ("render", "default_color") => set_string(&mut config.render.default_color, val),
            ("render", "departure_color") => {
                set_string(&mut config.render.departure_color, val)
            }
            ("render", "arrival_color") => set_string(&mut config.render.arrival_color, val),
            ("render", "alpha") => set_float(&mut config.render.alpha, val),
            _ => tracing::debug!("ignoring config key {section}.{key}"),
        }
    }

    config
}

fn set_float(slot: &mut f64, val: &str) {
    if let Some(v) = parse_float_value(val) {
        *slot = v;
    }
}

fn set_string(slot: &mut String, val: &str) {
    if let Some(v) = parse_string_value(val) {
        *slot = v;
    }
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    match val {
        ".inf" | "inf" => Some(f64::INFINITY),
        _ => val.parse().ok(),
    }
}

/// Serialize config to YAML-like text.
fn serialize_config(config: &Config) -> String {
    let gap = if config.segmentation.gap_secs.is_infinite() {
        ".inf".to_string()
    } else {
        config.segmentation.gap_secs.to_string()
    };
    let lines = [
        "# flights configuration".to_string(),
        String::new(),
        "segmentation:".into(),
        format!("  gap_seconds: {gap}"),
        String::new(),
        "classification:".into(),
        format!("  climb_rate: {}", config.classification.climb_rate),
        format!("  descent_rate: {}", config.classification.descent_rate),
        format!(
            "  overflight_altitude: {}",
            config.classification.overflight_altitude
        ),
        String::new(),
        "render:".into(),
        format!("  default_color: \"{}\"", config.render.default_color),
        format!("  departure_color: \"{}\"", config.render.departure_color),
        format!("  arrival_color: \"{}\"", config.render.arrival_color),
        format!("  alpha: {}", config.render.alpha),
    ];

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
