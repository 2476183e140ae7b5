//! Synchronization Engine.
//!
//! The engine owns the feature stores of all eight layers and keeps three views of
//! them consistent: the shapes on the map, the rows of the attribute table and the
//! snapshots in the session cache.  The map only reports that a layer changed; what
//! the change means depends on the tool the user picked for that layer, so each
//! layer runs a small state machine:
//!
//! ```text
//!            Draw                     Delete
//!   Idle ───────────► AwaitingAdd    Idle ───────────► AwaitingDelete
//!     ▲                    │           ▲                     │
//!     └─ Pan/Modify/Move/Save/Cancel ──┴─────────────────────┘
//! ```
//!
//! While a solve is in flight every input is rejected with [`SyncError::InputBlocked`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{
    CodecError, DecodedFeature, FeatureRecord, decode_records, decode_snapshot, encode_features,
    encode_snapshot,
};
use crate::contour::{ContourError, ContourOverlay, decode_contours, decode_levels};
use crate::identity::{DeletionInference, infer_deleted_id, next_id, renumber_on_delete};
use crate::journal::{EventStatus, Journal, JournalEvent};
use crate::session::{LEVELS_KEY, SessionCache, SessionError};
use crate::solver::{SolverError, SolverResponse};
use crate::submission::SolverSubmission;
use crate::table::{RowIndex, TableSurface, TableView};
use crate::validate::{SubmissionError, validate_model};
use crate::{Feature, FeatureHandle, LayerKind, MapSurface, default_attributes, schema_for};

/////////////////////////////////////////////// Tools //////////////////////////////////////////////

/// A map tool the user can pick for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Draw,
    Delete,
    Pan,
    Modify,
    Move,
    Save,
    Cancel,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tool::Draw => "draw",
            Tool::Delete => "delete",
            Tool::Pan => "pan",
            Tool::Modify => "modify",
            Tool::Move => "move",
            Tool::Save => "save",
            Tool::Cancel => "cancel",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Tool {
    type Err = String;

    /// Accepts the plain names plus the shape-specific draw tools
    /// (`draw_point`, `draw_linestring`, `draw_polygon`, `draw_box`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s.starts_with("draw") {
            return Ok(Tool::Draw);
        }
        match s.as_str() {
            "delete" => Ok(Tool::Delete),
            "pan" => Ok(Tool::Pan),
            "modify" => Ok(Tool::Modify),
            "move" => Ok(Tool::Move),
            "save" => Ok(Tool::Save),
            "cancel" => Ok(Tool::Cancel),
            _ => Err(format!("unknown tool '{}'", s)),
        }
    }
}

/// What the next change notification on a layer means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolMode {
    /// Changes are not feature additions or deletions.
    Idle,
    /// The next change is a drawn feature.
    AwaitingAdd,
    /// The next change is a deletion.
    AwaitingDelete,
}

impl From<Tool> for ToolMode {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Draw => ToolMode::AwaitingAdd,
            Tool::Delete => ToolMode::AwaitingDelete,
            Tool::Pan | Tool::Modify | Tool::Move | Tool::Save | Tool::Cancel => ToolMode::Idle,
        }
    }
}

/////////////////////////////////////////////// State //////////////////////////////////////////////

/// Feature store and tool state of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerState {
    kind: LayerKind,
    features: Vec<Feature>,
    mode: ToolMode,
    color: String,
}

impl LayerState {
    fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            features: Vec::new(),
            mode: ToolMode::Idle,
            color: kind.default_color().to_string(),
        }
    }

    /// The layer.
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Features in ascending id order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Current tool mode.
    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    /// Current stroke color.
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Number of features.
    pub fn count(&self) -> usize {
        self.features.len()
    }

    /// The feature with `id`.
    pub fn feature(&self, id: u32) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.id == id)
    }

    fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.features.iter().map(|feature| feature.id)
    }
}

/// The table currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedTable {
    /// Whose features are shown.
    pub layer: LayerKind,
    /// Whether the cells accept input.
    pub editable: bool,
    /// Row to feature association.
    pub rows: RowIndex,
}

/// Everything the engine knows, in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    layers: [LayerState; 8],
    displayed: Option<DisplayedTable>,
    input_blocked: bool,
}

impl AppState {
    fn new() -> Self {
        Self {
            layers: LayerKind::ALL.map(LayerState::new),
            displayed: None,
            input_blocked: false,
        }
    }

    /// State of one layer.
    pub fn layer(&self, kind: LayerKind) -> &LayerState {
        &self.layers[kind.index()]
    }

    /// Every layer, in registry order.
    pub fn layers(&self) -> &[LayerState] {
        &self.layers
    }

    /// The table on screen, if any.
    pub fn displayed(&self) -> Option<&DisplayedTable> {
        self.displayed.as_ref()
    }

    /// True while a solve is in flight.
    pub fn input_blocked(&self) -> bool {
        self.input_blocked
    }

    fn feature_slices(&self) -> impl Iterator<Item = (LayerKind, &[Feature])> {
        self.layers
            .iter()
            .map(|layer| (layer.kind, layer.features.as_slice()))
    }
}

///////////////////////////////////////////// Outcomes /////////////////////////////////////////////

/// What a change notification did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// The layer was idle; nothing to do.
    Ignored,
    /// A new shape is not retrievable yet; the next notification retries.
    Deferred,
    /// Features were added with these ids.
    Added(Vec<u32>),
    /// Features with these ids were removed, in removal order.
    Deleted(Vec<u32>),
    /// The delete left nothing to remove.
    Cancelled,
}

/// How a solve round trip ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SolveOutcome {
    /// Contours were drawn.
    Rendered {
        /// Levels used for the color bands.
        levels: Vec<f64>,
        /// Number of contours drawn.
        contours: usize,
    },
    /// The solver ran and reported an error.
    SolverReported(String),
    /// The solver could not be reached or its answer could not be read.
    Failed(String),
}

/// Claim on an in-flight solve, held by whoever waits for the solver.
///
/// A ticket dropped before [`SolveTicket::settle`] marks its solve abandoned and
/// the engine releases the input guard on its next event.
#[derive(Debug)]
pub struct SolveTicket {
    abandoned: Arc<AtomicBool>,
    settled: bool,
}

impl SolveTicket {
    /// The solver answered; the caller is about to call [`SyncEngine::finish_solve`].
    pub fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for SolveTicket {
    fn drop(&mut self) {
        if !self.settled {
            self.abandoned.store(true, Ordering::SeqCst);
        }
    }
}

/// Errors from engine operations.
#[derive(Debug)]
pub enum SyncError {
    /// A solve is in flight.
    InputBlocked,
    /// The model cannot be submitted.
    Validation(SubmissionError),
    /// Feature records could not be decoded.
    Codec(CodecError),
    /// The session store failed.
    Session(SessionError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::InputBlocked => write!(f, "a model run is in progress; try again when it finishes"),
            SyncError::Validation(e) => write!(f, "{}", e),
            SyncError::Codec(e) => write!(f, "{}", e),
            SyncError::Session(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<SubmissionError> for SyncError {
    fn from(e: SubmissionError) -> Self {
        SyncError::Validation(e)
    }
}

impl From<CodecError> for SyncError {
    fn from(e: CodecError) -> Self {
        SyncError::Codec(e)
    }
}

impl From<SessionError> for SyncError {
    fn from(e: SessionError) -> Self {
        SyncError::Session(e)
    }
}

////////////////////////////////////////////// Engine //////////////////////////////////////////////

/// Keeps the map, the table and the session in step with the feature stores.
pub struct SyncEngine<M, T, S> {
    map: M,
    table: T,
    session: S,
    state: AppState,
    journal: Journal,
    notices: Vec<String>,
    in_flight: Option<Arc<AtomicBool>>,
}

impl<M, T, S> SyncEngine<M, T, S>
where
    M: MapSurface,
    T: TableSurface,
    S: SessionCache,
{
    /// Creates an engine with empty layers and an in-memory journal.
    ///
    /// Call [`SyncEngine::initialize`] to restore a previous session.
    pub fn new(map: M, table: T, session: S) -> Self {
        Self {
            map,
            table,
            session,
            state: AppState::new(),
            journal: Journal::in_memory(),
            notices: Vec::new(),
            in_flight: None,
        }
    }

    /// Replaces the journal.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// The map surface.
    pub fn map(&self) -> &M {
        &self.map
    }

    /// The map surface, for drawing.
    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    /// The table surface.
    pub fn table(&self) -> &T {
        &self.table
    }

    /// The table surface, for typing into cells.
    pub fn table_mut(&mut self) -> &mut T {
        &mut self.table
    }

    /// The session store.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// The session store, for maintenance outside the engine.
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// The whole application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// State of one layer.
    pub fn layer(&self, kind: LayerKind) -> &LayerState {
        self.state.layer(kind)
    }

    /// Features of one layer in ascending id order.
    pub fn features(&self, kind: LayerKind) -> &[Feature] {
        self.state.layer(kind).features()
    }

    /// The event journal.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// True while a solve is in flight.
    pub fn is_input_blocked(&self) -> bool {
        self.state.input_blocked && !self.solve_abandoned()
    }

    /// Drains the messages meant for the user.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn solve_abandoned(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|abandoned| abandoned.load(Ordering::SeqCst))
    }

    fn guard(&mut self, operation: &str) -> Result<(), SyncError> {
        if self.state.input_blocked && self.solve_abandoned() {
            self.state.input_blocked = false;
            self.in_flight = None;
            self.journal
                .record(JournalEvent::SolveAbandoned, EventStatus::Cancelled);
        }
        if self.state.input_blocked {
            self.journal.record(
                JournalEvent::InputBlocked {
                    operation: operation.to_string(),
                },
                EventStatus::Failed,
            );
            return Err(SyncError::InputBlocked);
        }
        Ok(())
    }

    /////////////////////////////////////////// Start-up ///////////////////////////////////////////

    /// Restores every layer's features and color from the session.
    ///
    /// A snapshot that cannot be decoded is journaled and leaves its layer empty.
    /// Returns the number of features restored.
    pub fn initialize(&mut self) -> usize {
        let mut restored = 0;
        for kind in LayerKind::ALL {
            if let Some(style) = self.session.get(&kind.style_key()) {
                let color = serde_json::from_str::<String>(&style).unwrap_or(style);
                self.state.layers[kind.index()].color = color;
            }
            let color = self.state.layer(kind).color.clone();
            self.map.set_layer_style(kind, &color);

            if let Some(snapshot) = self.session.get(&kind.features_key()) {
                let decoded =
                    decode_snapshot(&snapshot).and_then(|records| decode_records(kind, &records));
                match decoded {
                    Ok(decoded) => {
                        let count = decoded.len();
                        self.install_layer(kind, decoded);
                        self.journal.record(
                            JournalEvent::SnapshotRestored {
                                layer: kind,
                                records: count,
                            },
                            EventStatus::Success,
                        );
                        restored += count;
                    }
                    Err(e) => {
                        self.journal.record(
                            JournalEvent::SnapshotRejected {
                                layer: kind,
                                error: e.to_string(),
                            },
                            EventStatus::Failed,
                        );
                    }
                }
            }
            self.table
                .set_feature_count(kind, self.state.layer(kind).count());
        }
        restored
    }

    /// Replaces a layer's shapes and store with decoded features.
    fn install_layer(&mut self, kind: LayerKind, decoded: Vec<DecodedFeature>) {
        self.map.clear_layer(kind);
        let mut features = Vec::with_capacity(decoded.len());
        for item in decoded {
            let handle = self.map.add_feature(kind, Some(item.geometry.clone()));
            features.push(Feature {
                handle,
                id: item.id,
                geometry: item.geometry,
                attributes: item.attributes,
            });
        }
        features.sort_by_key(|feature| feature.id);
        self.state.layers[kind.index()].features = features;
        let displayed = self
            .state
            .displayed
            .as_ref()
            .filter(|displayed| displayed.layer == kind)
            .map(|displayed| displayed.editable);
        if let Some(editable) = displayed {
            self.show_table(kind, editable);
        }
        self.table
            .set_feature_count(kind, self.state.layer(kind).count());
    }

    //////////////////////////////////////////// Tools /////////////////////////////////////////////

    /// Picks a tool for `layer`.  Every other layer goes idle.
    pub fn select_tool(&mut self, layer: LayerKind, tool: Tool) -> Result<(), SyncError> {
        self.guard("select tool")?;
        for state in self.state.layers.iter_mut() {
            state.mode = if state.kind == layer {
                ToolMode::from(tool)
            } else {
                ToolMode::Idle
            };
        }
        self.journal
            .record(JournalEvent::ToolSelected { layer, tool }, EventStatus::Success);
        if tool == Tool::Save {
            self.export_layer(layer)?;
        }
        Ok(())
    }

    /// Handles a change notification from the map, according to the layer's mode.
    pub fn on_layer_changed(&mut self, layer: LayerKind) -> Result<SyncOutcome, SyncError> {
        self.guard("layer change")?;
        match self.state.layer(layer).mode {
            ToolMode::Idle => Ok(SyncOutcome::Ignored),
            ToolMode::AwaitingAdd => self.on_feature_added(layer),
            ToolMode::AwaitingDelete => {
                let survivors: Vec<FeatureHandle> = self
                    .map
                    .features(layer)
                    .into_iter()
                    .map(|feature| feature.handle)
                    .collect();
                self.on_feature_deleted(layer, &survivors)
            }
        }
    }

    ///////////////////////////////////////////// Adds /////////////////////////////////////////////

    /// Adopts every shape on the map that the store does not know yet.
    ///
    /// A shape without geometry is left on the map and retried on the next
    /// notification; shapes after it are still adopted.  A shape of the wrong kind
    /// is skipped.
    pub fn on_feature_added(&mut self, layer: LayerKind) -> Result<SyncOutcome, SyncError> {
        self.guard("add feature")?;
        let known: HashSet<FeatureHandle> = self
            .state
            .layer(layer)
            .features
            .iter()
            .map(|feature| feature.handle)
            .collect();
        let mut candidates: Vec<_> = self
            .map
            .features(layer)
            .into_iter()
            .filter(|feature| !known.contains(&feature.handle))
            .collect();
        candidates.sort_by_key(|feature| feature.handle);

        let mut added = Vec::new();
        for candidate in candidates {
            let geometry = match candidate.geometry {
                Some(geometry) if geometry.kind() == layer.geometry_kind() => geometry,
                Some(geometry) => {
                    self.journal.record(
                        JournalEvent::AddDeferred {
                            layer,
                            reason: format!(
                                "shape {} is a {}, expected {}",
                                candidate.handle,
                                geometry.kind(),
                                layer.geometry_kind()
                            ),
                        },
                        EventStatus::Failed,
                    );
                    continue;
                }
                None => {
                    self.journal.record(
                        JournalEvent::AddDeferred {
                            layer,
                            reason: format!("shape {} is not retrievable yet", candidate.handle),
                        },
                        EventStatus::Deferred,
                    );
                    continue;
                }
            };

            let state = &mut self.state.layers[layer.index()];
            let id = next_id(state.ids());
            let feature = Feature {
                handle: candidate.handle,
                id,
                geometry,
                attributes: default_attributes(layer, id),
            };
            let label = feature.label().to_string();
            let cells = row_cells(&feature);
            state.features.push(feature);

            if let Some(displayed) = self.state.displayed.as_mut() {
                if displayed.layer == layer {
                    displayed.rows.push(candidate.handle);
                    self.table.append_row(cells);
                }
            }
            self.journal.record(
                JournalEvent::FeatureAdded { layer, id, label },
                EventStatus::Success,
            );
            added.push(id);
        }

        self.table
            .set_feature_count(layer, self.state.layer(layer).count());
        if added.is_empty() {
            Ok(SyncOutcome::Deferred)
        } else {
            Ok(SyncOutcome::Added(added))
        }
    }

    /////////////////////////////////////////// Deletes ////////////////////////////////////////////

    /// Drops the features whose shapes are no longer among `survivors`.
    ///
    /// The deleted id is inferred from the gap in the surviving ids, one gap at a
    /// time, so several shapes removed in one notification are all resolved.
    pub fn on_feature_deleted(
        &mut self,
        layer: LayerKind,
        survivors: &[FeatureHandle],
    ) -> Result<SyncOutcome, SyncError> {
        self.guard("delete feature")?;
        let survivors: HashSet<FeatureHandle> = survivors.iter().copied().collect();
        let state = &mut self.state.layers[layer.index()];
        let mut deleted = Vec::new();

        loop {
            let survivor_ids: Vec<u32> = state
                .features
                .iter()
                .filter(|feature| survivors.contains(&feature.handle))
                .map(|feature| feature.id)
                .collect();
            let id = match infer_deleted_id(&survivor_ids, state.features.len()) {
                DeletionInference::Unchanged => break,
                DeletionInference::Deleted(id) => id,
            };
            let Some(position) = state.features.iter().position(|feature| feature.id == id) else {
                self.journal.record(
                    JournalEvent::DeleteUnresolved {
                        layer,
                        inferred_id: id,
                    },
                    EventStatus::Failed,
                );
                break;
            };
            let removed = state.features.remove(position);
            let renumbered = renumber_on_delete(&mut state.features, id);

            if let Some(displayed) = self.state.displayed.as_mut() {
                if displayed.layer == layer {
                    if let Some(row) = displayed.rows.remove(removed.handle) {
                        self.table.remove_row(row);
                    }
                }
            }
            self.journal.record(
                JournalEvent::FeatureDeleted {
                    layer,
                    id,
                    label: removed.label().to_string(),
                    renumbered,
                },
                EventStatus::Success,
            );
            deleted.push(id);
        }

        if deleted.is_empty() {
            self.journal.record(
                JournalEvent::DeleteCancelled {
                    layer,
                    remaining: state.features.len(),
                },
                EventStatus::Cancelled,
            );
            return Ok(SyncOutcome::Cancelled);
        }
        let count = state.features.len();
        self.table.set_feature_count(layer, count);
        Ok(SyncOutcome::Deleted(deleted))
    }

    //////////////////////////////////////////// Table /////////////////////////////////////////////

    /// Writes the displayed table's cell values into `layer`'s features, when that
    /// table is on screen and editable.  Returns the features in id order.
    pub fn commit_edits(&mut self, layer: LayerKind) -> Result<Vec<Feature>, SyncError> {
        self.guard("commit edits")?;
        if self
            .state
            .displayed
            .as_ref()
            .is_some_and(|displayed| displayed.layer == layer)
        {
            self.commit_displayed();
        }
        Ok(self.state.layer(layer).features.clone())
    }

    /// Commits the table on screen if it is editable.
    fn commit_displayed(&mut self) {
        let Some(displayed) = self.state.displayed.as_ref() else {
            return;
        };
        if !displayed.editable {
            return;
        }
        let layer = displayed.layer;
        let state = &mut self.state.layers[layer.index()];
        let mut rows = 0;
        for (row, handle) in displayed.rows.iter() {
            let Some(feature) = state.features.iter_mut().find(|f| f.handle == handle) else {
                continue;
            };
            for field in schema_for(layer) {
                if let Some(value) = self.table.cell_value(row, field) {
                    feature.attributes.set(field, value);
                }
            }
            rows += 1;
        }
        self.journal
            .record(JournalEvent::EditsCommitted { layer, rows }, EventStatus::Success);
    }

    /// Shows `layer`'s table, committing the edits of an editable table first.
    pub fn render_table(&mut self, layer: LayerKind, editable: bool) -> Result<TableView, SyncError> {
        self.guard("render table")?;
        self.commit_displayed();
        Ok(self.show_table(layer, editable))
    }

    fn show_table(&mut self, layer: LayerKind, editable: bool) -> TableView {
        let state = self.state.layer(layer);
        let view = TableView {
            layer,
            columns: schema_for(layer).iter().map(|c| c.to_string()).collect(),
            rows: state.features.iter().map(row_cells).collect(),
            editable,
        };
        let mut rows = RowIndex::new();
        rows.rebuild(state.features.iter().map(|feature| feature.handle));
        let count = state.count();
        self.state.displayed = Some(DisplayedTable {
            layer,
            editable,
            rows,
        });
        self.table.render(view.clone());
        self.table.set_feature_count(layer, count);
        view
    }

    ///////////////////////////////////////// Persistence //////////////////////////////////////////

    /// Commits pending edits, then writes the layer's snapshot and returns its records.
    pub fn export_layer(&mut self, layer: LayerKind) -> Result<Vec<FeatureRecord>, SyncError> {
        self.guard("export layer")?;
        if self
            .state
            .displayed
            .as_ref()
            .is_some_and(|displayed| displayed.layer == layer)
        {
            self.commit_displayed();
        }
        self.write_snapshot(layer)
    }

    /// Saves the layer and puts its tool back to idle.
    pub fn save_layer(&mut self, layer: LayerKind) -> Result<Vec<FeatureRecord>, SyncError> {
        self.select_tool(layer, Tool::Cancel)?;
        self.export_layer(layer)
    }

    fn write_snapshot(&mut self, layer: LayerKind) -> Result<Vec<FeatureRecord>, SyncError> {
        let records = encode_features(&self.state.layer(layer).features);
        let text = encode_snapshot(&records)?;
        self.session.set(&layer.features_key(), text)?;
        self.journal.record(
            JournalEvent::SnapshotWritten {
                layer,
                records: records.len(),
            },
            EventStatus::Success,
        );
        Ok(records)
    }

    /// Replaces the layer's features with `records` and writes the new snapshot.
    ///
    /// Returns the number of features imported.  Nothing changes when a record is
    /// rejected.
    pub fn import_layer(
        &mut self,
        layer: LayerKind,
        records: &[FeatureRecord],
    ) -> Result<usize, SyncError> {
        self.guard("import layer")?;
        let decoded = decode_records(layer, records)?;
        let count = decoded.len();
        self.install_layer(layer, decoded);
        self.journal.record(
            JournalEvent::SnapshotRestored {
                layer,
                records: count,
            },
            EventStatus::Success,
        );
        self.write_snapshot(layer)?;
        Ok(count)
    }

    /// Changes a layer's stroke color and remembers it in the session.
    pub fn set_layer_color(&mut self, layer: LayerKind, color: &str) -> Result<(), SyncError> {
        self.guard("set layer color")?;
        self.state.layers[layer.index()].color = color.to_string();
        self.map.set_layer_style(layer, color);
        let encoded = serde_json::to_string(color).map_err(CodecError::from)?;
        self.session.set(&layer.style_key(), encoded)?;
        self.journal.record(
            JournalEvent::StyleChanged {
                layer,
                color: color.to_string(),
            },
            EventStatus::Success,
        );
        Ok(())
    }

    //////////////////////////////////////////// Solve /////////////////////////////////////////////

    /// Validates and serializes the model, then blocks input until
    /// [`SyncEngine::finish_solve`].
    ///
    /// A validation failure is queued as a notice and leaves every store untouched.
    pub fn begin_solve(&mut self) -> Result<SolverSubmission, SyncError> {
        self.guard("solve")?;
        if let Err(e) = validate_model(self.state.feature_slices()) {
            self.notices.push(e.to_string());
            self.journal.record(
                JournalEvent::ValidationFailed {
                    message: e.to_string(),
                },
                EventStatus::Failed,
            );
            return Err(SyncError::Validation(e));
        }
        self.commit_displayed();
        let submission = SolverSubmission::build(self.state.feature_slices(), self.map.viewport())?;
        self.state.input_blocked = true;
        self.in_flight = Some(Arc::new(AtomicBool::new(false)));
        self.journal.record(
            JournalEvent::SolveStarted {
                features: submission.element_count(),
            },
            EventStatus::Success,
        );
        Ok(submission)
    }

    /// A ticket for the solve started by [`SyncEngine::begin_solve`], if one is in
    /// flight.
    pub fn solve_ticket(&self) -> Option<SolveTicket> {
        let abandoned = self.in_flight.as_ref()?;
        self.state.input_blocked.then(|| SolveTicket {
            abandoned: Arc::clone(abandoned),
            settled: false,
        })
    }

    /// Releases the input guard and draws the result, if there is one.
    pub fn finish_solve(&mut self, result: Result<SolverResponse, SolverError>) -> SolveOutcome {
        self.state.input_blocked = false;
        self.in_flight = None;
        let response = match result {
            Ok(response) => response,
            Err(e) => return self.solve_failed(SolveOutcome::Failed(e.to_string())),
        };
        if let Some(error) = response.error {
            return self.solve_failed(SolveOutcome::SolverReported(error));
        }
        let decoded = response
            .heads
            .as_ref()
            .ok_or(ContourError::Missing("heads"))
            .and_then(decode_levels)
            .and_then(|levels| {
                let contours = response
                    .contours
                    .as_ref()
                    .ok_or(ContourError::Missing("contours"))
                    .and_then(decode_contours)?;
                Ok((levels, contours))
            });
        let (levels, contours) = match decoded {
            Ok(decoded) => decoded,
            Err(e) => return self.solve_failed(SolveOutcome::Failed(e.to_string())),
        };

        let overlay = ContourOverlay::from_contours(levels.clone(), contours);
        let count = overlay.lines.len();
        self.map.replace_overlay(overlay);
        let heads = match response.heads {
            Some(Value::String(text)) => text,
            Some(value) => value.to_string(),
            None => String::new(),
        };
        if let Err(e) = self.session.set(LEVELS_KEY, heads) {
            self.journal.record(
                JournalEvent::LevelsNotStored {
                    error: e.to_string(),
                },
                EventStatus::Failed,
            );
        }
        self.journal.record(
            JournalEvent::SolveCompleted {
                levels: levels.len(),
                contours: count,
            },
            EventStatus::Success,
        );
        SolveOutcome::Rendered {
            levels,
            contours: count,
        }
    }

    fn solve_failed(&mut self, outcome: SolveOutcome) -> SolveOutcome {
        let error = match &outcome {
            SolveOutcome::SolverReported(error) | SolveOutcome::Failed(error) => error.clone(),
            SolveOutcome::Rendered { .. } => String::new(),
        };
        self.journal
            .record(JournalEvent::SolveFailed { error }, EventStatus::Failed);
        outcome
    }
}

/// A feature's cells in schema order.
fn row_cells(feature: &Feature) -> Vec<String> {
    feature
        .attributes
        .values()
        .into_iter()
        .map(|(_, value)| value.to_string())
        .collect()
}
