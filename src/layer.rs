//! The fixed registry of drawable layers.
//!
//! A groundwater model is drawn on eight layers, one per analytic element type.
//! The set never changes at runtime: every layer exists from start-up, is always
//! editable, and carries a display name, a label prefix used for new features, a
//! geometry kind, a default stroke color and the keys under which its features are
//! sent to the solver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::GeometryKind;

/// One of the eight model layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    /// The reference point with the model-wide aquifer parameters.
    #[serde(rename = "Constant and Model")]
    ConstantModel,
    /// Pumping or injection wells.
    #[serde(rename = "Wells")]
    Wells,
    /// Line sinks with a specified strength.
    #[serde(rename = "Line Sinks")]
    LineSinks,
    /// Line sinks with a specified head.
    #[serde(rename = "Head Line Sinks")]
    HeadLineSinks,
    /// Line sinks with a specified head and an entry resistance.
    #[serde(rename = "Res Line Sinks")]
    ResLineSinks,
    /// Impermeable line doublets.
    #[serde(rename = "Line Doublet Imp")]
    LineDoubletImp,
    /// Ditches with a total discharge.
    #[serde(rename = "Line Sink Ditch")]
    LineSinkDitch,
    /// Polygonal inhomogeneities.
    #[serde(rename = "Polygon Inhom")]
    PolygonInhom,
}

impl LayerKind {
    /// Every layer, in the order the map stacks them from top to bottom.
    pub const ALL: [LayerKind; 8] = [
        LayerKind::ConstantModel,
        LayerKind::Wells,
        LayerKind::LineSinks,
        LayerKind::HeadLineSinks,
        LayerKind::ResLineSinks,
        LayerKind::LineDoubletImp,
        LayerKind::LineSinkDitch,
        LayerKind::PolygonInhom,
    ];

    /// The line-geometry layers, the ones subject to the two-vertex rule.
    pub const LINE_LAYERS: [LayerKind; 5] = [
        LayerKind::LineSinks,
        LayerKind::HeadLineSinks,
        LayerKind::ResLineSinks,
        LayerKind::LineDoubletImp,
        LayerKind::LineSinkDitch,
    ];

    /// Position in [`LayerKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The display name, also the session-key stem.
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::ConstantModel => "Constant and Model",
            LayerKind::Wells => "Wells",
            LayerKind::LineSinks => "Line Sinks",
            LayerKind::HeadLineSinks => "Head Line Sinks",
            LayerKind::ResLineSinks => "Res Line Sinks",
            LayerKind::LineDoubletImp => "Line Doublet Imp",
            LayerKind::LineSinkDitch => "Line Sink Ditch",
            LayerKind::PolygonInhom => "Polygon Inhom",
        }
    }

    /// A URL-friendly name, e.g. `head-line-sinks`.
    pub fn slug(self) -> String {
        self.name().to_lowercase().replace(' ', "-")
    }

    /// Prefix of the default label given to new features (`Well_3`).
    pub fn label_prefix(self) -> &'static str {
        match self {
            LayerKind::ConstantModel => "Constant",
            LayerKind::Wells => "Well",
            LayerKind::LineSinks => "LineSink",
            LayerKind::HeadLineSinks => "HeadLineSink",
            LayerKind::ResLineSinks => "ResLineSink",
            LayerKind::LineDoubletImp => "LineDoubletImp",
            LayerKind::LineSinkDitch => "LineSinkDitch",
            LayerKind::PolygonInhom => "PolygonInhom",
        }
    }

    /// The only geometry kind this layer accepts.
    pub fn geometry_kind(self) -> GeometryKind {
        match self {
            LayerKind::ConstantModel | LayerKind::Wells => GeometryKind::Point,
            LayerKind::PolygonInhom => GeometryKind::Polygon,
            _ => GeometryKind::LineString,
        }
    }

    /// The stroke color a layer starts with.
    pub fn default_color(self) -> &'static str {
        match self {
            LayerKind::ConstantModel => "#ff0000",
            LayerKind::Wells => "#fff000",
            LayerKind::LineSinks => "#0000ff",
            LayerKind::HeadLineSinks => "#ADD8E6",
            LayerKind::ResLineSinks => "#008000",
            LayerKind::LineDoubletImp => "#000000",
            LayerKind::LineSinkDitch => "#8B4513",
            LayerKind::PolygonInhom => "rgba(10,10,10,0.5)",
        }
    }

    /// The solver query parameter that carries this layer's features.
    ///
    /// The constant layer is split over `model`, `constant` and `uflow` instead.
    pub fn solver_param(self) -> Option<&'static str> {
        match self {
            LayerKind::ConstantModel => None,
            LayerKind::Wells => Some("wells"),
            LayerKind::LineSinks => Some("line_sink"),
            LayerKind::HeadLineSinks => Some("head_line_sink"),
            LayerKind::ResLineSinks => Some("res_line_sink"),
            LayerKind::LineDoubletImp => Some("line_doublet_imp"),
            LayerKind::LineSinkDitch => Some("line_sink_ditch"),
            LayerKind::PolygonInhom => Some("polygon_inhom"),
        }
    }

    /// Prefix of the per-feature keys inside the solver parameter (`well_0`).
    pub fn solver_record_prefix(self) -> &'static str {
        match self {
            LayerKind::ConstantModel => "constant",
            LayerKind::Wells => "well",
            LayerKind::LineSinks => "line_sink",
            LayerKind::HeadLineSinks => "head_line_sink",
            LayerKind::ResLineSinks => "res_line_sink",
            LayerKind::LineDoubletImp => "line_doublet_imp",
            LayerKind::LineSinkDitch => "line_sink_ditch",
            LayerKind::PolygonInhom => "polygoninhom",
        }
    }

    /// Session key of the layer's feature snapshot.
    pub fn features_key(self) -> String {
        format!("{}_Features", self.name())
    }

    /// Session key of the layer's stroke color.
    pub fn style_key(self) -> String {
        format!("{}_Style", self.name())
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a string names no layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerParseError {
    /// The input string that failed to parse
    pub input: String,
}

impl fmt::Display for LayerParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown layer '{}'", self.input)
    }
}

impl std::error::Error for LayerParseError {}

impl FromStr for LayerKind {
    type Err = LayerParseError;

    /// Accepts the display name or the slug, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        LayerKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().to_lowercase() == wanted || kind.slug() == wanted)
            .ok_or_else(|| LayerParseError {
                input: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_names_and_slugs() {
        assert_eq!(
            "Head Line Sinks".parse::<LayerKind>().unwrap(),
            LayerKind::HeadLineSinks
        );
        assert_eq!(
            "head-line-sinks".parse::<LayerKind>().unwrap(),
            LayerKind::HeadLineSinks
        );
        assert_eq!(
            "constant and model".parse::<LayerKind>().unwrap(),
            LayerKind::ConstantModel
        );
        assert!("Rivers".parse::<LayerKind>().is_err());
    }

    #[test]
    fn every_slug_round_trips() {
        for kind in LayerKind::ALL {
            assert_eq!(kind.slug().parse::<LayerKind>().unwrap(), kind);
            assert_eq!(kind.to_string().parse::<LayerKind>().unwrap(), kind);
        }
    }

    #[test]
    fn indexes_follow_registry_order() {
        for (index, kind) in LayerKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), index);
        }
    }

    #[test]
    fn session_keys() {
        assert_eq!(LayerKind::Wells.features_key(), "Wells_Features");
        assert_eq!(LayerKind::PolygonInhom.style_key(), "Polygon Inhom_Style");
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&LayerKind::LineSinkDitch).unwrap();
        assert_eq!(json, "\"Line Sink Ditch\"");
        let back: LayerKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LayerKind::LineSinkDitch);
    }

    #[test]
    fn geometry_kinds() {
        assert_eq!(LayerKind::Wells.geometry_kind(), GeometryKind::Point);
        assert_eq!(LayerKind::PolygonInhom.geometry_kind(), GeometryKind::Polygon);
        for kind in LayerKind::LINE_LAYERS {
            assert_eq!(kind.geometry_kind(), GeometryKind::LineString);
        }
    }
}
