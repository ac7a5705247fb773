//! SVG map canvas with a plate carrée projection.
//!
//! Longitude maps linearly to x and latitude to y, with one scale for both
//! axes so tracks keep their shape.

use flights_core::{Canvas, PathStyle};

/// Smallest span (degrees) a bounding box is allowed to have.
const MIN_SPAN_DEG: f64 = 1e-4;
/// Fraction of the data span added as margin on each side.
const MARGIN: f64 = 0.05;

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Smallest box around `(longitude, latitude)` points, plus a margin.
    pub fn around<I>(points: I) -> Option<Bounds>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (lon, lat) = iter.next()?;
        let mut b = Bounds {
            min_lon: lon,
            max_lon: lon,
            min_lat: lat,
            max_lat: lat,
        };
        for (lon, lat) in iter {
            b.min_lon = b.min_lon.min(lon);
            b.max_lon = b.max_lon.max(lon);
            b.min_lat = b.min_lat.min(lat);
            b.max_lat = b.max_lat.max(lat);
        }
        let pad_lon = (b.lon_span() * MARGIN).max(MIN_SPAN_DEG);
        let pad_lat = (b.lat_span() * MARGIN).max(MIN_SPAN_DEG);
        Some(Bounds {
            min_lon: b.min_lon - pad_lon,
            max_lon: b.max_lon + pad_lon,
            min_lat: b.min_lat - pad_lat,
            max_lat: b.max_lat + pad_lat,
        })
    }

    fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

pub struct SvgCanvas {
    width: f64,
    height: f64,
    bounds: Bounds,
    scale: f64,
    paths: Vec<String>,
}

impl SvgCanvas {
    pub fn new(width: u32, height: u32, bounds: Bounds) -> Self {
        let width = f64::from(width);
        let height = f64::from(height);
        let scale = (width / bounds.lon_span().max(MIN_SPAN_DEG))
            .min(height / bounds.lat_span().max(MIN_SPAN_DEG));
        SvgCanvas {
            width,
            height,
            bounds,
            scale,
            paths: Vec::new(),
        }
    }

    /// Project `(longitude, latitude)` to pixel coordinates.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = (lon - self.bounds.min_lon) * self.scale;
        let y = (self.bounds.max_lat - lat) * self.scale;
        (x, y)
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// The finished SVG document.
    pub fn finish(&self) -> String {
        let mut out = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = self.width,
            h = self.height
        );
        out.push_str("<rect width=\"100%\" height=\"100%\" fill=\"#1c2331\"/>\n");
        for p in &self.paths {
            out.push_str(p);
            out.push('\n');
        }
        out.push_str("</svg>\n");
        out
    }
}

impl Canvas for SvgCanvas {
    fn draw_path(&mut self, points: &[(f64, f64)], style: &PathStyle) {
        let coords: Vec<String> = points
            .iter()
            .map(|&(lon, lat)| {
                let (x, y) = self.project(lon, lat);
                format!("{x:.1},{y:.1}")
            })
            .collect();
        self.paths.push(format!(
            "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-opacity=\"{}\" stroke-width=\"1\"/>",
            coords.join(" "),
            escape_attr(&style.color),
            style.alpha
        ));
    }
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
