//! # Layer Command Handler
//!
//! Read-only views of the layer registry and of the features saved in the session.

use serde::Serialize;

use crate::cli_utils::{self, OutputFormat};
use crate::commands::shared::{
    Workspace, dispatch_command, parse_layer_or_exit, validate_args_count_or_exit,
};
use crate::{FeatureView, GeometryKind, LayerKind, schema_for};

const LAYER_USAGE: &str = "Usage: wellctl layer <list|schema|show> [layer]";

#[derive(Debug, Serialize)]
struct LayerListing {
    layer: LayerKind,
    slug: String,
    geometry: GeometryKind,
    color: String,
    features: usize,
}

#[derive(Debug, Serialize)]
struct LayerSchema {
    layer: LayerKind,
    geometry: GeometryKind,
    label_prefix: &'static str,
    fields: &'static [&'static str],
}

/// Handles all layer-related commands.
pub async fn handle_layer_command(args: &[String], workspace: &Workspace, output: OutputFormat) {
    dispatch_command!("layer", LAYER_USAGE, args, workspace, output, {
        "list" => handle_layer_list,
        "schema" => handle_layer_schema,
        "show" => handle_layer_show,
    });
}

async fn handle_layer_list(args: &[String], workspace: &Workspace, output: OutputFormat) {
    validate_args_count_or_exit(args, 1, 1, "list", "Usage: wellctl layer list");
    let engine = workspace.open_engine_or_exit();
    let listing: Vec<LayerListing> = engine
        .state()
        .layers()
        .iter()
        .map(|state| LayerListing {
            layer: state.kind(),
            slug: state.kind().slug(),
            geometry: state.kind().geometry_kind(),
            color: state.color().to_string(),
            features: state.count(),
        })
        .collect();
    cli_utils::print_formatted_or_exit(&listing, output, "layers");
}

async fn handle_layer_schema(args: &[String], _workspace: &Workspace, output: OutputFormat) {
    validate_args_count_or_exit(args, 2, 2, "schema", "Usage: wellctl layer schema <layer>");
    let layer = parse_layer_or_exit(&args[1]);
    let schema = LayerSchema {
        layer,
        geometry: layer.geometry_kind(),
        label_prefix: layer.label_prefix(),
        fields: schema_for(layer),
    };
    cli_utils::print_formatted_or_exit(&schema, output, "schema");
}

async fn handle_layer_show(args: &[String], workspace: &Workspace, output: OutputFormat) {
    validate_args_count_or_exit(args, 2, 2, "show", "Usage: wellctl layer show <layer>");
    let layer = parse_layer_or_exit(&args[1]);
    let engine = workspace.open_engine_or_exit();
    let features: Vec<FeatureView> = engine
        .features(layer)
        .iter()
        .map(FeatureView::from)
        .collect();
    if features.is_empty() {
        println!("No features on {}", layer);
    } else {
        cli_utils::print_formatted_or_exit(&features, output, "features");
    }
}
