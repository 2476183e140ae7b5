//! # Wellhead: the interaction layer of a groundwater model editor
//!
//! A groundwater model is drawn on a map as analytic elements: one constant
//! reference point, wells, several kinds of line sinks, impermeable line doublets
//! and polygonal inhomogeneities.  Each element carries a row of attributes that the
//! user edits in a table, and the whole model is sent to a remote solver that
//! answers with elevation contours.
//!
//! This crate keeps those views of the model consistent:
//!
//! - **Layer registry**: eight fixed layers, each with a geometry kind, a label
//!   prefix, a default color and a typed attribute schema
//! - **Feature stores**: per-layer features with dense ids `1..=n` that are
//!   renumbered on delete, while labels stay as they were assigned
//! - **Synchronization**: map change notifications are interpreted through each
//!   layer's tool mode and mirrored into the table and the session
//! - **Session snapshots**: flat JSON records per layer, restored at start-up
//! - **Solver round trip**: validation, request building, contour decoding and
//!   level-colored overlays, with input blocked while a solve is in flight
//! - **Journal**: every engine event is kept in memory and optionally appended to
//!   a JSONL file
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ HTTP API (axum) / wellctl CLI           │
//! ├─────────────────────────────────────────┤
//! │ SyncEngine (tool modes, table rows)     │
//! ├──────────────┬──────────────┬───────────┤
//! │ MapSurface   │ TableSurface │ Session   │
//! ├──────────────┴──────────────┴───────────┤
//! │ Codec / Validation / Solver client      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! # use wellhead::{Geometry, InMemoryMap, InMemorySessionCache, InMemoryTable, LayerKind,
//! #     MapSurface, SyncEngine, SyncOutcome, Tool};
//! let mut engine = SyncEngine::new(
//!     InMemoryMap::new(),
//!     InMemoryTable::new(),
//!     InMemorySessionCache::new(),
//! );
//! engine.select_tool(LayerKind::Wells, Tool::Draw).unwrap();
//!
//! // The map reports a finished drawing; the engine adopts it.
//! engine.map_mut().add_feature(LayerKind::Wells, Some(Geometry::Point([10.0, 20.0])));
//! let outcome = engine.on_layer_changed(LayerKind::Wells).unwrap();
//! assert_eq!(outcome, SyncOutcome::Added(vec![1]));
//! assert_eq!(engine.features(LayerKind::Wells)[0].label(), "Well_1");
//! ```

extern crate self as wellhead;

mod codec;
mod contour;
mod engine;
mod feature;
mod geometry;
mod identity;
mod journal;
mod layer;
mod map;
mod schema;
mod session;
mod solver;
mod submission;
mod table;
mod test_utils;
mod validate;

/// Command-line interface utilities for program termination and output formatting.
pub mod cli_utils;

/// Command handlers for the wellctl CLI.
pub mod commands;

/// Configuration files for the daemon and the CLI.
pub mod config;

/// HTTP API over a synchronization engine.
pub mod router;

pub use codec::{
    CodecError, DecodedFeature, FeatureRecord, decode_records, decode_snapshot, encode_features,
    encode_snapshot,
};
pub use config::{SolverConfig, WellheadConfig, load_config, save_config};
pub use contour::{
    BAND_COLORS, CONTOUR_TITLE, CONTOUR_WIDTH, ContourError, ContourLine, ContourOverlay,
    OVERFLOW_BAND_COLOR, Rgb, StyledContour, UNLEVELED_COLOR, band_color, decode_contours,
    decode_levels,
};
pub use engine::{
    AppState, DisplayedTable, LayerState, SolveOutcome, SolveTicket, SyncEngine, SyncError,
    SyncOutcome, Tool, ToolMode,
};
pub use feature::{Feature, FeatureHandle, FeatureView};
pub use geometry::{Coordinate, Extent, Geometry, GeometryKind};
pub use identity::{DeletionInference, infer_deleted_id, is_dense, next_id, renumber_on_delete};
pub use journal::{EventStatus, Journal, JournalEntry, JournalEvent};
pub use layer::{LayerKind, LayerParseError};
pub use map::{InMemoryMap, MapFeature, MapSurface};
pub use router::{WorkspaceEngine, create_workspace_router};
pub use schema::{
    AttributeRecord, Attributes, ConstantModelAttributes, HeadLineSinkAttributes,
    LineDoubletImpAttributes, LineSinkAttributes, LineSinkDitchAttributes,
    PolygonInhomAttributes, ResLineSinkAttributes, WellAttributes, default_attributes, schema_for,
};
pub use session::{FileSessionCache, InMemorySessionCache, LEVELS_KEY, SessionCache, SessionError};
pub use solver::{Solver, SolverClient, SolverError, SolverResponse, run_solve};
pub use submission::SolverSubmission;
pub use table::{InMemoryTable, RowIndex, TableSurface, TableView};
pub use validate::{SubmissionError, validate_model};
