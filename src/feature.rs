use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Attributes, Geometry, LayerKind};

/// Map-surface identity of a drawn shape.
///
/// Handles are assigned by the map when a shape is drawn and never reused.  They are
/// the only link between a shape on the map and its record in the feature store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureHandle(pub u64);

impl fmt::Display for FeatureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FeatureHandle {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FeatureHandle(s.parse()?))
    }
}

/// A drawn shape together with its layer-local id and typed attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// The map shape this feature mirrors.
    pub handle: FeatureHandle,
    /// Dense position in the layer, `1..=count`.
    pub id: u32,
    /// The drawn shape.
    pub geometry: Geometry,
    /// User-editable values, typed by layer.
    pub attributes: Attributes,
}

impl Feature {
    /// The layer this feature lives on.
    pub fn kind(&self) -> LayerKind {
        self.attributes.kind()
    }

    /// The user-visible label.  It is assigned once and never follows id changes.
    pub fn label(&self) -> &str {
        self.attributes.label()
    }
}

/// Read-only view of a feature for API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureView {
    /// Map handle.
    pub handle: FeatureHandle,
    /// Layer-local id.
    #[serde(rename = "ID")]
    pub id: u32,
    /// The drawn shape.
    pub geometry: Geometry,
    /// Attribute values keyed by schema field name.
    pub attributes: Map<String, Value>,
}

impl From<&Feature> for FeatureView {
    fn from(feature: &Feature) -> Self {
        Self {
            handle: feature.handle,
            id: feature.id,
            geometry: feature.geometry.clone(),
            attributes: feature.attributes.to_json(),
        }
    }
}
