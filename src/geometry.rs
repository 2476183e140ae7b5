//! GeoJSON-shaped geometries as drawn on the map.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A map coordinate, `[x, y]` in the map projection.
pub type Coordinate = [f64; 2];

/// The shape class a layer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    /// A single coordinate.
    Point,
    /// An open path of two or more vertices.
    LineString,
    /// One or more closed rings; the first ring is the outer boundary.
    Polygon,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryKind::Point => write!(f, "Point"),
            GeometryKind::LineString => write!(f, "LineString"),
            GeometryKind::Polygon => write!(f, "Polygon"),
        }
    }
}

/// A drawn shape.
///
/// Serializes the way GeoJSON does: `{"type": "Point", "coordinates": [x, y]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single coordinate.
    Point(Coordinate),
    /// An open path.
    LineString(Vec<Coordinate>),
    /// Closed rings, outer boundary first.
    Polygon(Vec<Vec<Coordinate>>),
}

impl Geometry {
    /// The shape class of this geometry.
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// Number of vertices: 1 for a point, the path length for a line, and the
    /// outer ring length for a polygon.
    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::LineString(path) => path.len(),
            Geometry::Polygon(rings) => rings.first().map(Vec::len).unwrap_or(0),
        }
    }

    /// The bare coordinates as a JSON value, without the type tag.
    pub fn coordinates(&self) -> Value {
        let result = match self {
            Geometry::Point(point) => serde_json::to_value(point),
            Geometry::LineString(path) => serde_json::to_value(path),
            Geometry::Polygon(rings) => serde_json::to_value(rings),
        };
        // Arrays of finite floats always serialize; non-finite ones become null.
        result.unwrap_or(Value::Null)
    }

    /// Rebuilds a geometry from a kind and its bare coordinates.
    pub fn from_coordinates(kind: GeometryKind, coordinates: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            GeometryKind::Point => Geometry::Point(serde_json::from_value(coordinates)?),
            GeometryKind::LineString => Geometry::LineString(serde_json::from_value(coordinates)?),
            GeometryKind::Polygon => Geometry::Polygon(serde_json::from_value(coordinates)?),
        })
    }
}

/// The visible map window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Lower-left corner.
    pub min: Coordinate,
    /// Upper-right corner.
    pub max: Coordinate,
}

impl Extent {
    /// Creates an extent from its corners.
    pub fn new(min: Coordinate, max: Coordinate) -> Self {
        Self { min, max }
    }

    /// `[min_x, min_y, max_x, max_y]`, the order the solver expects.
    pub fn corners(&self) -> [f64; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::new([-100.0, -100.0], [100.0, 100.0])
    }
}
