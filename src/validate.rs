//! Pre-submission validation.
//!
//! The solver needs exactly one constant reference point and represents every
//! line element as a single segment.  Anything else is rejected here, before a
//! request is built, with a message the user can act on.

use std::fmt;

use crate::{Feature, LayerKind};

/// Why a model cannot be sent to the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// The constant layer does not hold exactly one feature.
    ConstantCount {
        /// How many constants were drawn.
        found: usize,
    },
    /// A line feature has more than two vertices.
    TooManyVertices {
        /// Layer of the offending feature.
        layer: LayerKind,
        /// Its label.
        label: String,
        /// Its vertex count.
        vertices: usize,
    },
    /// A line feature has fewer than two vertices.
    TooFewVertices {
        /// Layer of the offending feature.
        layer: LayerKind,
        /// Its label.
        label: String,
        /// Its vertex count.
        vertices: usize,
    },
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::ConstantCount { .. } => {
                write!(f, "Make sure that you have only one constant")
            }
            SubmissionError::TooManyVertices { label, .. } => write!(
                f,
                "Feature '{}' has more than 2 vertices. Please break up your feature to have only 2 vertices",
                label
            ),
            SubmissionError::TooFewVertices { label, .. } => write!(
                f,
                "Feature '{}' has fewer than 2 vertices. Please redraw it with exactly 2 vertices",
                label
            ),
        }
    }
}

impl std::error::Error for SubmissionError {}

/// Checks every layer of a model.
///
/// The constant count is checked first, then the line layers in registry order and
/// each layer's features in id order; the first problem found is reported.
pub fn validate_model<'a, I>(layers: I) -> Result<(), SubmissionError>
where
    I: IntoIterator<Item = (LayerKind, &'a [Feature])>,
{
    let layers: Vec<(LayerKind, &'a [Feature])> = layers.into_iter().collect();
    let features_of = |kind: LayerKind| -> &'a [Feature] {
        layers
            .iter()
            .find(|(layer, _)| *layer == kind)
            .map(|(_, features)| *features)
            .unwrap_or(&[])
    };

    let constants = features_of(LayerKind::ConstantModel).len();
    if constants != 1 {
        return Err(SubmissionError::ConstantCount { found: constants });
    }

    for kind in LayerKind::LINE_LAYERS {
        let mut features: Vec<&Feature> = features_of(kind).iter().collect();
        features.sort_by_key(|feature| feature.id);
        for feature in features {
            validate_line(kind, feature)?;
        }
    }
    Ok(())
}

fn validate_line(layer: LayerKind, feature: &Feature) -> Result<(), SubmissionError> {
    let vertices = feature.geometry.vertex_count();
    if vertices > 2 {
        Err(SubmissionError::TooManyVertices {
            layer,
            label: feature.label().to_string(),
            vertices,
        })
    } else if vertices < 2 {
        Err(SubmissionError::TooFewVertices {
            layer,
            label: feature.label().to_string(),
            vertices,
        })
    } else {
        Ok(())
    }
}
