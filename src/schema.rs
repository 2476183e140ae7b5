//! Attribute Schema Registry.
//!
//! Each layer has a typed attribute record whose field order is the column order of
//! its table and the key order of its export records.  All values are kept as the
//! strings the user typed; the solver parses them.

use serde_json::{Map, Value};

use crate::LayerKind;

/// A typed attribute record with an ordered list of named string fields.
///
/// Implemented with `#[derive(wellhead_derive::AttributeRecord)]`.
pub trait AttributeRecord {
    /// Field names in schema order.
    const FIELDS: &'static [&'static str];

    /// Reads a field by schema name.
    fn get(&self, field: &str) -> Option<&str>;

    /// Borrows a field mutably by schema name.
    fn get_mut(&mut self, field: &str) -> Option<&mut String>;
}

/// Attributes of the constant reference point and the model-wide parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, wellhead_derive::AttributeRecord)]
pub struct ConstantModelAttributes {
    #[field("Label")]
    pub label: String,
    #[field("constant head")]
    pub constant_head: String,
    #[field("constant layer")]
    pub constant_layer: String,
    #[field("uflow grad")]
    pub uflow_grad: String,
    #[field("uflow angle")]
    pub uflow_angle: String,
    pub k: String,
    pub zb: String,
    pub zt: String,
    pub c: String,
    pub n: String,
    pub nll: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, wellhead_derive::AttributeRecord)]
pub struct WellAttributes {
    #[field("Label")]
    pub label: String,
    #[field("Qw")]
    pub qw: String,
    pub rw: String,
    pub layers: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, wellhead_derive::AttributeRecord)]
pub struct LineSinkAttributes {
    #[field("Label")]
    pub label: String,
    pub sigma: String,
    pub layers: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, wellhead_derive::AttributeRecord)]
pub struct HeadLineSinkAttributes {
    #[field("Label")]
    pub label: String,
    pub head: String,
    pub layers: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, wellhead_derive::AttributeRecord)]
pub struct ResLineSinkAttributes {
    #[field("Label")]
    pub label: String,
    pub head: String,
    pub res: String,
    pub width: String,
    pub layers: String,
    pub bottomelev: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, wellhead_derive::AttributeRecord)]
pub struct LineDoubletImpAttributes {
    #[field("Label")]
    pub label: String,
    pub order: String,
    pub layers: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, wellhead_derive::AttributeRecord)]
pub struct LineSinkDitchAttributes {
    #[field("Label")]
    pub label: String,
    #[field("Q")]
    pub q: String,
    pub res: String,
    pub width: String,
    pub layers: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, wellhead_derive::AttributeRecord)]
pub struct PolygonInhomAttributes {
    #[field("Label")]
    pub label: String,
    #[field("Naquifers")]
    pub naquifers: String,
    pub k: String,
    pub zb: String,
    pub zt: String,
    pub c: String,
    pub n: String,
    pub nll: String,
    #[field("inhom side order")]
    pub inhom_side_order: String,
}

/// The attributes of one feature, typed by its layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attributes {
    ConstantModel(ConstantModelAttributes),
    Wells(WellAttributes),
    LineSinks(LineSinkAttributes),
    HeadLineSinks(HeadLineSinkAttributes),
    ResLineSinks(ResLineSinkAttributes),
    LineDoubletImp(LineDoubletImpAttributes),
    LineSinkDitch(LineSinkDitchAttributes),
    PolygonInhom(PolygonInhomAttributes),
}

macro_rules! with_record {
    ($attributes:expr, $record:ident => $body:expr) => {
        match $attributes {
            Attributes::ConstantModel($record) => $body,
            Attributes::Wells($record) => $body,
            Attributes::LineSinks($record) => $body,
            Attributes::HeadLineSinks($record) => $body,
            Attributes::ResLineSinks($record) => $body,
            Attributes::LineDoubletImp($record) => $body,
            Attributes::LineSinkDitch($record) => $body,
            Attributes::PolygonInhom($record) => $body,
        }
    };
}

impl Attributes {
    /// The layer these attributes belong to.
    pub fn kind(&self) -> LayerKind {
        match self {
            Attributes::ConstantModel(_) => LayerKind::ConstantModel,
            Attributes::Wells(_) => LayerKind::Wells,
            Attributes::LineSinks(_) => LayerKind::LineSinks,
            Attributes::HeadLineSinks(_) => LayerKind::HeadLineSinks,
            Attributes::ResLineSinks(_) => LayerKind::ResLineSinks,
            Attributes::LineDoubletImp(_) => LayerKind::LineDoubletImp,
            Attributes::LineSinkDitch(_) => LayerKind::LineSinkDitch,
            Attributes::PolygonInhom(_) => LayerKind::PolygonInhom,
        }
    }

    /// Field names in schema order.
    pub fn fields(&self) -> &'static [&'static str] {
        schema_for(self.kind())
    }

    /// Reads a field by schema name.
    pub fn get(&self, field: &str) -> Option<&str> {
        with_record!(self, record => record.get(field))
    }

    /// Writes a field by schema name.  Returns false when the layer has no such field.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> bool {
        let slot = with_record!(self, record => record.get_mut(field));
        match slot {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// The `Label` field.
    pub fn label(&self) -> &str {
        self.get("Label").unwrap_or_default()
    }

    /// `(field, value)` pairs in schema order.
    pub fn values(&self) -> Vec<(&'static str, &str)> {
        self.fields()
            .iter()
            .map(|field| (*field, self.get(field).unwrap_or_default()))
            .collect()
    }

    /// The attributes as a JSON object of strings, in schema order.
    pub fn to_json(&self) -> Map<String, Value> {
        self.values()
            .into_iter()
            .map(|(field, value)| (field.to_string(), Value::String(value.to_string())))
            .collect()
    }
}

/// The ordered field list of a layer.
pub fn schema_for(kind: LayerKind) -> &'static [&'static str] {
    match kind {
        LayerKind::ConstantModel => ConstantModelAttributes::FIELDS,
        LayerKind::Wells => WellAttributes::FIELDS,
        LayerKind::LineSinks => LineSinkAttributes::FIELDS,
        LayerKind::HeadLineSinks => HeadLineSinkAttributes::FIELDS,
        LayerKind::ResLineSinks => ResLineSinkAttributes::FIELDS,
        LayerKind::LineDoubletImp => LineDoubletImpAttributes::FIELDS,
        LayerKind::LineSinkDitch => LineSinkDitchAttributes::FIELDS,
        LayerKind::PolygonInhom => PolygonInhomAttributes::FIELDS,
    }
}

/// Empty attributes for a new feature, labelled `<prefix>_<id>`.
pub fn default_attributes(kind: LayerKind, id: u32) -> Attributes {
    let mut attributes = match kind {
        LayerKind::ConstantModel => Attributes::ConstantModel(Default::default()),
        LayerKind::Wells => Attributes::Wells(Default::default()),
        LayerKind::LineSinks => Attributes::LineSinks(Default::default()),
        LayerKind::HeadLineSinks => Attributes::HeadLineSinks(Default::default()),
        LayerKind::ResLineSinks => Attributes::ResLineSinks(Default::default()),
        LayerKind::LineDoubletImp => Attributes::LineDoubletImp(Default::default()),
        LayerKind::LineSinkDitch => Attributes::LineSinkDitch(Default::default()),
        LayerKind::PolygonInhom => Attributes::PolygonInhom(Default::default()),
    };
    attributes.set("Label", format!("{}_{}", kind.label_prefix(), id));
    attributes
}
