//! Drawing seam between flights and a map-projection backend.
//!
//! A `Canvas` receives geographic points (longitude, latitude in degrees)
//! and owns the projection. flights-core only decides what to draw and in
//! which colour.

use crate::config::RenderConfig;

/// Stroke settings for one trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStyle {
    pub color: String,
    pub alpha: f64,
}

/// Which palette entry a flight is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathColor {
    Default,
    Departure,
    Arrival,
}

impl PathColor {
    pub fn style(self, config: &RenderConfig) -> PathStyle {
        let color = match self {
            PathColor::Default => &config.default_color,
            PathColor::Departure => &config.departure_color,
            PathColor::Arrival => &config.arrival_color,
        };
        PathStyle {
            color: color.clone(),
            alpha: config.alpha,
        }
    }
}

/// A map surface that can draw connected paths.
pub trait Canvas {
    /// Draw a polyline through `points`, each `(longitude, latitude)`.
    fn draw_path(&mut self, points: &[(f64, f64)], style: &PathStyle);
}

/// Canvas that just remembers what it was asked to draw.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub paths: Vec<(Vec<(f64, f64)>, PathStyle)>,
}

#[cfg(test)]
impl Canvas for RecordingCanvas {
    fn draw_path(&mut self, points: &[(f64, f64)], style: &PathStyle) {
        self.paths.push((points.to_vec(), style.clone()));
    }
}
