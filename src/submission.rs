//! The solver request.
//!
//! The solver takes one query parameter per element family, each holding a
//! JSON-encoded object.  The constant layer is split three ways: the aquifer
//! parameters (`model`), the reference head (`constant`) and the optional uniform
//! flow (`uflow`).  Every other layer becomes an object keyed `<prefix>_<index>`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::validate::{SubmissionError, validate_model};
use crate::{Extent, Feature, LayerKind};

const MODEL_FIELDS: [&str; 6] = ["k", "zb", "zt", "c", "n", "nll"];

/// A validated model, ready to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSubmission {
    pub model: Map<String, Value>,
    pub constant: Map<String, Value>,
    pub uflow: Map<String, Value>,
    pub wells: Map<String, Value>,
    pub line_sink: Map<String, Value>,
    pub head_line_sink: Map<String, Value>,
    pub res_line_sink: Map<String, Value>,
    pub line_doublet_imp: Map<String, Value>,
    pub line_sink_ditch: Map<String, Value>,
    pub polygon_inhom: Map<String, Value>,
    /// `[min_x, min_y, max_x, max_y]` of the visible map.
    pub map_corners: [f64; 4],
}

impl SolverSubmission {
    /// Validates the model and builds the request from it.
    pub fn build<'a, I>(layers: I, viewport: Extent) -> Result<Self, SubmissionError>
    where
        I: IntoIterator<Item = (LayerKind, &'a [Feature])>,
    {
        let layers: Vec<(LayerKind, &'a [Feature])> = layers.into_iter().collect();
        validate_model(layers.iter().copied())?;

        let features_of = |kind: LayerKind| -> Vec<&'a Feature> {
            let mut features: Vec<&'a Feature> = layers
                .iter()
                .filter(|(layer, _)| *layer == kind)
                .flat_map(|(_, features)| *features)
                .collect();
            features.sort_by_key(|feature| feature.id);
            features
        };

        let constants = features_of(LayerKind::ConstantModel);
        let constant = constants[0];
        let attribute = |field: &str| -> Value {
            Value::String(constant.attributes.get(field).unwrap_or_default().to_string())
        };

        let model = MODEL_FIELDS
            .iter()
            .map(|field| (field.to_string(), attribute(*field)))
            .collect();

        let mut constant_params = Map::new();
        constant_params.insert("coordinates".to_string(), constant.geometry.coordinates());
        constant_params.insert("head".to_string(), attribute("constant head"));
        constant_params.insert("layer".to_string(), attribute("constant layer"));
        constant_params.insert("label".to_string(), json!(constant.label()));

        let mut uflow = Map::new();
        let grad = constant.attributes.get("uflow grad").unwrap_or_default();
        let angle = constant.attributes.get("uflow angle").unwrap_or_default();
        if !grad.is_empty() && !angle.is_empty() {
            uflow.insert("uflow grad".to_string(), json!(grad));
            uflow.insert("uflow angle".to_string(), json!(angle));
        }

        let layer_params = |kind: LayerKind| -> Map<String, Value> {
            features_of(kind)
                .into_iter()
                .enumerate()
                .map(|(index, feature)| {
                    (
                        format!("{}_{}", kind.solver_record_prefix(), index),
                        element_record(feature),
                    )
                })
                .collect()
        };

        Ok(Self {
            model,
            constant: constant_params,
            uflow,
            wells: layer_params(LayerKind::Wells),
            line_sink: layer_params(LayerKind::LineSinks),
            head_line_sink: layer_params(LayerKind::HeadLineSinks),
            res_line_sink: layer_params(LayerKind::ResLineSinks),
            line_doublet_imp: layer_params(LayerKind::LineDoubletImp),
            line_sink_ditch: layer_params(LayerKind::LineSinkDitch),
            polygon_inhom: layer_params(LayerKind::PolygonInhom),
            map_corners: viewport.corners(),
        })
    }

    /// The element objects of a non-constant layer.
    pub fn layer(&self, kind: LayerKind) -> Option<&Map<String, Value>> {
        match kind {
            LayerKind::ConstantModel => None,
            LayerKind::Wells => Some(&self.wells),
            LayerKind::LineSinks => Some(&self.line_sink),
            LayerKind::HeadLineSinks => Some(&self.head_line_sink),
            LayerKind::ResLineSinks => Some(&self.res_line_sink),
            LayerKind::LineDoubletImp => Some(&self.line_doublet_imp),
            LayerKind::LineSinkDitch => Some(&self.line_sink_ditch),
            LayerKind::PolygonInhom => Some(&self.polygon_inhom),
        }
    }

    /// Number of elements sent, the constant included.
    pub fn element_count(&self) -> usize {
        1 + LayerKind::ALL
            .iter()
            .filter_map(|kind| self.layer(*kind))
            .map(Map::len)
            .sum::<usize>()
    }

    /// Query parameters, each value JSON-encoded.
    pub fn query_params(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        let mut params = vec![
            ("model", serde_json::to_string(&self.model)?),
            ("constant", serde_json::to_string(&self.constant)?),
            ("uflow", serde_json::to_string(&self.uflow)?),
        ];
        for kind in LayerKind::ALL {
            if let (Some(name), Some(elements)) = (kind.solver_param(), self.layer(kind)) {
                params.push((name, serde_json::to_string(elements)?));
            }
        }
        params.push(("map_corners", serde_json::to_string(&self.map_corners)?));
        Ok(params)
    }
}

/// `{coordinates, <fields other than Label>, label}` for one element.
fn element_record(feature: &Feature) -> Value {
    let kind = feature.kind();
    let mut record = Map::new();
    record.insert("coordinates".to_string(), feature.geometry.coordinates());
    for (field, value) in feature.attributes.values() {
        if field != "Label" {
            record.insert(wire_name(kind, field).to_string(), json!(value));
        }
    }
    record.insert("label".to_string(), json!(feature.label()));
    Value::Object(record)
}

/// The solver's key for a schema field.
fn wire_name(kind: LayerKind, field: &'static str) -> &'static str {
    match (kind, field) {
        (LayerKind::PolygonInhom, "inhom side order") => "order",
        _ => field,
    }
}
