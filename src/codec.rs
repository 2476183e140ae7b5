//! Export/Import Codec.
//!
//! A layer is exported as an array of flat records:
//!
//! ```json
//! [{"geometryType": "Point", "coordinates": [10.0, 20.0], "Label": "Well_1", "Qw": "100", "rw": "0.3", "layers": "0"}]
//! ```
//!
//! The same array is the session snapshot of the layer and the body accepted by
//! import.  Export never writes ids; import accepts an optional `ID` key.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::is_dense;
use crate::{
    Attributes, Feature, Geometry, GeometryKind, LayerKind, default_attributes, schema_for,
};

/// One exported feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Shape class of `coordinates`.
    #[serde(rename = "geometryType")]
    pub geometry_type: GeometryKind,
    /// Bare GeoJSON coordinates.
    pub coordinates: Value,
    /// Attribute values, plus an optional `ID` on import.  Unknown keys are kept
    /// here and ignored.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl FeatureRecord {
    /// The `ID` key, when present as a positive integer or a numeric string.
    pub fn id(&self) -> Option<u32> {
        let id = match self.fields.get("ID")? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        id.filter(|id| *id > 0)
    }
}

/// A record turned back into feature parts, before the map hands out a handle.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFeature {
    /// Assigned id.
    pub id: u32,
    /// The shape to draw.
    pub geometry: Geometry,
    /// Typed attributes.
    pub attributes: Attributes,
}

/// Errors turning records back into features.
#[derive(Debug)]
pub enum CodecError {
    /// The snapshot text is not a JSON array of records.
    Json(serde_json::Error),
    /// A record's geometry does not fit the layer.
    WrongGeometry {
        /// Position of the record in the input.
        index: usize,
        /// What the layer accepts.
        expected: GeometryKind,
        /// What the record carried.
        found: GeometryKind,
    },
    /// A record's coordinates do not have the shape its geometry type needs.
    BadCoordinates {
        /// Position of the record in the input.
        index: usize,
        /// Parser message.
        message: String,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Json(e) => write!(f, "invalid feature records: {}", e),
            CodecError::WrongGeometry {
                index,
                expected,
                found,
            } => write!(
                f,
                "record {} is a {} but the layer holds {} features",
                index, found, expected
            ),
            CodecError::BadCoordinates { index, message } => {
                write!(f, "record {} has malformed coordinates: {}", index, message)
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError::Json(e)
    }
}

/// Encodes features as records in ascending id order.
pub fn encode_features(features: &[Feature]) -> Vec<FeatureRecord> {
    let mut sorted: Vec<&Feature> = features.iter().collect();
    sorted.sort_by_key(|feature| feature.id);
    sorted
        .into_iter()
        .map(|feature| FeatureRecord {
            geometry_type: feature.geometry.kind(),
            coordinates: feature.geometry.coordinates(),
            fields: feature.attributes.to_json(),
        })
        .collect()
}

/// Decodes records for `kind`, in ascending id order.
///
/// Ids come from the `ID` keys when every record has one and together they are
/// `{1..n}`; otherwise ids follow record order.
pub fn decode_records(
    kind: LayerKind,
    records: &[FeatureRecord],
) -> Result<Vec<DecodedFeature>, CodecError> {
    let explicit: Vec<Option<u32>> = records.iter().map(FeatureRecord::id).collect();
    let use_explicit = !explicit.is_empty()
        && explicit.iter().all(Option::is_some)
        && is_dense(explicit.iter().flatten().copied());

    let mut decoded = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let expected = kind.geometry_kind();
        if record.geometry_type != expected {
            return Err(CodecError::WrongGeometry {
                index,
                expected,
                found: record.geometry_type,
            });
        }
        let geometry = Geometry::from_coordinates(record.geometry_type, record.coordinates.clone())
            .map_err(|e| CodecError::BadCoordinates {
                index,
                message: e.to_string(),
            })?;
        let id = match explicit[index] {
            Some(id) if use_explicit => id,
            _ => index as u32 + 1,
        };
        let mut attributes = default_attributes(kind, id);
        for field in schema_for(kind) {
            if let Some(value) = record.fields.get(*field) {
                attributes.set(field, value_to_cell(value));
            }
        }
        decoded.push(DecodedFeature {
            id,
            geometry,
            attributes,
        });
    }
    decoded.sort_by_key(|feature| feature.id);
    Ok(decoded)
}

/// Serializes records as snapshot text.
pub fn encode_snapshot(records: &[FeatureRecord]) -> Result<String, CodecError> {
    Ok(serde_json::to_string(records)?)
}

/// Parses snapshot text.
pub fn decode_snapshot(text: &str) -> Result<Vec<FeatureRecord>, CodecError> {
    Ok(serde_json::from_str(text)?)
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeatureHandle;
    use serde_json::json;

    fn well(id: u32, qw: &str) -> Feature {
        let mut attributes = default_attributes(LayerKind::Wells, id);
        attributes.set("Qw", qw);
        Feature {
            handle: FeatureHandle(id as u64),
            id,
            geometry: Geometry::Point([id as f64, 2.0 * id as f64]),
            attributes,
        }
    }

    #[test]
    fn export_is_flat_and_ordered() {
        let records = encode_features(&[well(2, "20"), well(1, "10")]);
        let value = serde_json::to_value(&records).unwrap();
        assert_eq!(
            value[0],
            json!({
                "geometryType": "Point",
                "coordinates": [1.0, 2.0],
                "Label": "Well_1",
                "Qw": "10",
                "rw": "",
                "layers": ""
            })
        );
        assert_eq!(value[1]["Label"], "Well_2");
        assert!(value[0].get("ID").is_none());
    }

    #[test]
    fn import_seeds_ids_in_record_order() {
        let records = encode_features(&[well(1, "10"), well(2, "20")]);
        let decoded = decode_records(LayerKind::Wells, &records).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].id, 1);
        assert_eq!(decoded[1].attributes.get("Qw"), Some("20"));
    }

    #[test]
    fn import_honors_dense_explicit_ids() {
        let records: Vec<FeatureRecord> = serde_json::from_value(json!([
            {"geometryType": "Point", "coordinates": [0.0, 0.0], "ID": 2, "Label": "B"},
            {"geometryType": "Point", "coordinates": [1.0, 1.0], "ID": "1", "Label": "A"}
        ]))
        .unwrap();
        let decoded = decode_records(LayerKind::Wells, &records).unwrap();
        assert_eq!(decoded[0].id, 1);
        assert_eq!(decoded[0].attributes.label(), "A");
        assert_eq!(decoded[1].attributes.label(), "B");
    }

    #[test]
    fn import_ignores_sparse_ids() {
        let records: Vec<FeatureRecord> = serde_json::from_value(json!([
            {"geometryType": "Point", "coordinates": [0.0, 0.0], "ID": 5, "Label": "B"},
            {"geometryType": "Point", "coordinates": [1.0, 1.0], "ID": 9, "Label": "A"}
        ]))
        .unwrap();
        let decoded = decode_records(LayerKind::Wells, &records).unwrap();
        assert_eq!(decoded[0].attributes.label(), "B");
        assert_eq!(decoded[1].id, 2);
    }

    #[test]
    fn import_stringifies_and_ignores_unknown_keys() {
        let records: Vec<FeatureRecord> = serde_json::from_value(json!([
            {"type": "Feature", "geometryType": "Point", "coordinates": [0.0, 0.0],
             "Qw": 125.5, "rw": null, "colour": "red"}
        ]))
        .unwrap();
        let decoded = decode_records(LayerKind::Wells, &records).unwrap();
        assert_eq!(decoded[0].attributes.get("Qw"), Some("125.5"));
        assert_eq!(decoded[0].attributes.get("rw"), Some(""));
        assert_eq!(decoded[0].attributes.label(), "Well_1");
    }

    #[test]
    fn import_rejects_wrong_geometry() {
        let records: Vec<FeatureRecord> = serde_json::from_value(json!([
            {"geometryType": "Point", "coordinates": [0.0, 0.0]}
        ]))
        .unwrap();
        match decode_records(LayerKind::LineSinks, &records) {
            Err(CodecError::WrongGeometry { index: 0, .. }) => {}
            other => panic!("expected wrong geometry, got {:?}", other),
        }
    }

    #[test]
    fn import_rejects_malformed_coordinates() {
        let records: Vec<FeatureRecord> = serde_json::from_value(json!([
            {"geometryType": "LineString", "coordinates": [0.0, 0.0]}
        ]))
        .unwrap();
        assert!(matches!(
            decode_records(LayerKind::LineSinks, &records),
            Err(CodecError::BadCoordinates { .. })
        ));
    }

    #[test]
    fn snapshot_text_round_trips() {
        let records = encode_features(&[well(1, "10")]);
        let text = encode_snapshot(&records).unwrap();
        assert_eq!(decode_snapshot(&text).unwrap(), records);
        assert!(decode_snapshot("{").is_err());
    }
}
