//! Contour decoding and styling.
//!
//! The solver answers with the contour levels it used and one line feature per
//! traced contour.  Each contour is colored by the position of its elevation among
//! the levels, and the whole set becomes one titled overlay on the map.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Coordinate;

/// Title of the solver result overlay.
pub const CONTOUR_TITLE: &str = "Elevation Contours";

/// Stroke width of every contour line.
pub const CONTOUR_WIDTH: f32 = 2.0;

/// An opaque stroke color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Colors of the first nine levels, lowest level first.
pub const BAND_COLORS: [Rgb; 9] = [
    Rgb(0, 0, 0),
    Rgb(170, 1, 20),
    Rgb(196, 100, 0),
    Rgb(255, 165, 0),
    Rgb(255, 255, 0),
    Rgb(0, 255, 0),
    Rgb(0, 218, 157),
    Rgb(0, 158, 223),
    Rgb(1, 107, 231),
];

/// Color of contours at any level past the ninth, or at no listed level.
pub const OVERFLOW_BAND_COLOR: Rgb = Rgb(0, 32, 229);

/// Color of contours that carry no elevation.
pub const UNLEVELED_COLOR: Rgb = Rgb(0, 0, 0);

/// The stroke color for a contour at `elevation`.
pub fn band_color(elevation: Option<f64>, levels: &[f64]) -> Rgb {
    let Some(elevation) = elevation else {
        return UNLEVELED_COLOR;
    };
    levels
        .iter()
        .take(BAND_COLORS.len())
        .position(|level| same_level(*level, elevation))
        .map(|band| BAND_COLORS[band])
        .unwrap_or(OVERFLOW_BAND_COLOR)
}

fn same_level(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// A traced contour as returned by the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourLine {
    /// Head along the contour, if the solver tagged it.
    pub elevation: Option<f64>,
    /// One or more polylines.
    pub paths: Vec<Vec<Coordinate>>,
}

/// A contour with its stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledContour {
    /// Head along the contour.
    pub elevation: Option<f64>,
    /// Stroke color.
    pub color: Rgb,
    /// Stroke width.
    pub width: f32,
    /// One or more polylines.
    pub paths: Vec<Vec<Coordinate>>,
}

/// A titled set of styled contours shown over the model layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourOverlay {
    /// Overlays are replaced by title.
    pub title: String,
    /// Levels the contours were traced at.
    pub levels: Vec<f64>,
    /// The contours.
    pub lines: Vec<StyledContour>,
}

impl ContourOverlay {
    /// Creates an overlay from already styled contours.
    pub fn new(title: impl Into<String>, levels: Vec<f64>, lines: Vec<StyledContour>) -> Self {
        Self {
            title: title.into(),
            levels,
            lines,
        }
    }

    /// Styles solver contours by level and titles them [`CONTOUR_TITLE`].
    pub fn from_contours(levels: Vec<f64>, contours: Vec<ContourLine>) -> Self {
        let lines = contours
            .into_iter()
            .map(|contour| StyledContour {
                elevation: contour.elevation,
                color: band_color(contour.elevation, &levels),
                width: CONTOUR_WIDTH,
                paths: contour.paths,
            })
            .collect();
        Self::new(CONTOUR_TITLE, levels, lines)
    }
}

/// Errors decoding a solver result.
#[derive(Debug)]
pub enum ContourError {
    /// A field held a string that is not JSON.
    Json(serde_json::Error),
    /// A required field is absent.
    Missing(&'static str),
    /// Levels are not a list of numbers.
    BadLevels(String),
    /// A contour could not be read.
    BadContour {
        /// Position in the contour list.
        index: usize,
        /// What was wrong.
        reason: String,
    },
}

impl fmt::Display for ContourError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContourError::Json(e) => write!(f, "solver result is not valid JSON: {}", e),
            ContourError::Missing(field) => write!(f, "solver result has no '{}'", field),
            ContourError::BadLevels(reason) => write!(f, "invalid contour levels: {}", reason),
            ContourError::BadContour { index, reason } => {
                write!(f, "invalid contour {}: {}", index, reason)
            }
        }
    }
}

impl std::error::Error for ContourError {}

impl From<serde_json::Error> for ContourError {
    fn from(e: serde_json::Error) -> Self {
        ContourError::Json(e)
    }
}

/// Solvers send nested JSON either inline or as an encoded string.
fn unwrap_encoded(value: &Value) -> Result<Value, ContourError> {
    match value {
        Value::String(text) => Ok(serde_json::from_str(text)?),
        other => Ok(other.clone()),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads the contour levels.
pub fn decode_levels(heads: &Value) -> Result<Vec<f64>, ContourError> {
    let heads = unwrap_encoded(heads)?;
    let items = match heads {
        Value::Array(items) => items,
        other => {
            return Err(ContourError::BadLevels(format!("expected a list, got {}", other)));
        }
    };
    items
        .iter()
        .map(|item| {
            as_number(item).ok_or_else(|| ContourError::BadLevels(format!("{} is not a number", item)))
        })
        .collect()
}

/// Reads the traced contours: a list of GeoJSON line features, or a
/// FeatureCollection holding them.
pub fn decode_contours(contours: &Value) -> Result<Vec<ContourLine>, ContourError> {
    let contours = unwrap_encoded(contours)?;
    let features = match contours {
        Value::Array(features) => features,
        Value::Object(mut collection) => match collection.remove("features") {
            Some(Value::Array(features)) => features,
            _ => return Err(ContourError::Missing("features")),
        },
        _ => return Err(ContourError::Missing("contours")),
    };
    features
        .iter()
        .enumerate()
        .map(|(index, feature)| decode_contour(index, feature))
        .collect()
}

fn decode_contour(index: usize, feature: &Value) -> Result<ContourLine, ContourError> {
    let bad = |reason: String| ContourError::BadContour { index, reason };
    let geometry = feature
        .get("geometry")
        .ok_or_else(|| bad("no geometry".to_string()))?;
    let kind = geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| bad("geometry has no type".to_string()))?;
    let coordinates = geometry
        .get("coordinates")
        .cloned()
        .ok_or_else(|| bad("geometry has no coordinates".to_string()))?;
    let raw_paths: Vec<Vec<Vec<f64>>> = match kind {
        "LineString" => vec![serde_json::from_value(coordinates).map_err(|e| bad(e.to_string()))?],
        "MultiLineString" => serde_json::from_value(coordinates).map_err(|e| bad(e.to_string()))?,
        other => return Err(bad(format!("unsupported geometry type {}", other))),
    };
    let mut paths = Vec::with_capacity(raw_paths.len());
    for raw in raw_paths {
        let mut path = Vec::with_capacity(raw.len());
        for position in raw {
            if position.len() < 2 {
                return Err(bad("position with fewer than two ordinates".to_string()));
            }
            path.push([position[0], position[1]]);
        }
        paths.push(path);
    }
    let elevation = feature
        .get("properties")
        .and_then(|properties| properties.get("elevation"))
        .and_then(as_number);
    Ok(ContourLine { elevation, paths })
}
