//! HTTP API over a [`SyncEngine`].
//!
//! The daemon plays the part of the map and table widgets: a client draws by posting
//! a geometry, deletes by naming a handle, and types into the table with cell edits.
//! Every handler locks the engine for the duration of one engine call, except
//! `POST /solve` which releases it while the solver works.  The solve runs in its
//! own task, so a client that hangs up does not cut the round trip short.
//!
//! Draws and deletes only go through when the layer's tool allows them; anything
//! else is a 409.

use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post, put};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::codec::FeatureRecord;
use crate::contour::ContourOverlay;
use crate::engine::{SolveOutcome, SyncEngine, SyncError, SyncOutcome, Tool, ToolMode};
use crate::solver::{Solver, run_solve};
use crate::table::TableView;
use crate::{
    FeatureHandle, FeatureView, Geometry, GeometryKind, InMemoryMap, InMemoryTable, LayerKind,
    MapSurface, SessionCache, schema_for,
};

/// The engine a daemon serves.
pub type WorkspaceEngine<S> = SyncEngine<InMemoryMap, InMemoryTable, S>;

/// Shared handler state.
pub struct WorkspaceState<S, C> {
    /// The engine behind the API.
    pub engine: Arc<Mutex<WorkspaceEngine<S>>>,
    /// Where `POST /solve` sends the model.
    pub solver: Arc<C>,
}

impl<S, C> Clone for WorkspaceState<S, C> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            solver: Arc::clone(&self.solver),
        }
    }
}

type ApiError = (StatusCode, String);

/////////////////////////////////////////// Request types //////////////////////////////////////////

/// Summary of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub layer: LayerKind,
    pub slug: String,
    pub geometry: GeometryKind,
    pub color: String,
    pub mode: ToolMode,
    pub count: usize,
}

/// A layer with its schema and features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDetail {
    #[serde(flatten)]
    pub summary: LayerSummary,
    pub fields: Vec<String>,
    pub features: Vec<FeatureView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectToolRequest {
    /// Any name [`Tool`] parses, e.g. `draw_point` or `delete`.
    pub tool: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawFeatureRequest {
    /// `None` stands for a shape whose geometry is not available yet.
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawFeatureResponse {
    pub handle: FeatureHandle,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub editable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellEditRequest {
    pub row: usize,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResponse {
    pub imported: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleRequest {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResponse {
    pub outcome: SolveOutcome,
    pub notices: Vec<String>,
}

///////////////////////////////////////////// Helpers //////////////////////////////////////////////

fn parse_layer(layer: &str) -> Result<LayerKind, ApiError> {
    LayerKind::from_str(layer).map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))
}

fn sync_error(e: SyncError) -> ApiError {
    let status = match &e {
        SyncError::InputBlocked => StatusCode::LOCKED,
        SyncError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SyncError::Codec(_) => StatusCode::BAD_REQUEST,
        SyncError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn ensure_unblocked<S: SessionCache>(engine: &WorkspaceEngine<S>) -> Result<(), ApiError> {
    if engine.is_input_blocked() {
        Err(sync_error(SyncError::InputBlocked))
    } else {
        Ok(())
    }
}

/// Shapes are only drawn or removed under the matching tool.
fn ensure_mode<S: SessionCache>(
    engine: &WorkspaceEngine<S>,
    layer: LayerKind,
    mode: ToolMode,
) -> Result<(), ApiError> {
    let current = engine.layer(layer).mode();
    if current == mode {
        Ok(())
    } else {
        Err((
            StatusCode::CONFLICT,
            format!("{} is in {:?} mode, select a tool first", layer, current),
        ))
    }
}

fn summarize<S: SessionCache>(engine: &WorkspaceEngine<S>, layer: LayerKind) -> LayerSummary {
    let state = engine.layer(layer);
    LayerSummary {
        layer,
        slug: layer.slug(),
        geometry: layer.geometry_kind(),
        color: state.color().to_string(),
        mode: state.mode(),
        count: state.count(),
    }
}

///////////////////////////////////////////// Handlers /////////////////////////////////////////////

async fn list_layers<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
) -> Json<Vec<LayerSummary>> {
    let engine = state.engine.lock().await;
    Json(
        LayerKind::ALL
            .iter()
            .map(|layer| summarize(&engine, *layer))
            .collect(),
    )
}

async fn get_layer<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
    Path(layer): Path<String>,
) -> Result<Json<LayerDetail>, ApiError> {
    let layer = parse_layer(&layer)?;
    let engine = state.engine.lock().await;
    Ok(Json(LayerDetail {
        summary: summarize(&engine, layer),
        fields: schema_for(layer).iter().map(|f| f.to_string()).collect(),
        features: engine.features(layer).iter().map(FeatureView::from).collect(),
    }))
}

async fn select_tool<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
    Path(layer): Path<String>,
    Json(request): Json<SelectToolRequest>,
) -> Result<Json<LayerSummary>, ApiError> {
    let layer = parse_layer(&layer)?;
    let tool = Tool::from_str(&request.tool).map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let mut engine = state.engine.lock().await;
    engine.select_tool(layer, tool).map_err(sync_error)?;
    Ok(Json(summarize(&engine, layer)))
}

async fn draw_feature<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
    Path(layer): Path<String>,
    Json(request): Json<DrawFeatureRequest>,
) -> Result<Json<DrawFeatureResponse>, ApiError> {
    let layer = parse_layer(&layer)?;
    let mut engine = state.engine.lock().await;
    ensure_unblocked(&engine)?;
    ensure_mode(&engine, layer, ToolMode::AwaitingAdd)?;
    let handle = engine.map_mut().add_feature(layer, request.geometry);
    let outcome = engine.on_layer_changed(layer).map_err(sync_error)?;
    Ok(Json(DrawFeatureResponse { handle, outcome }))
}

async fn delete_feature<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
    Path((layer, handle)): Path<(String, String)>,
) -> Result<Json<SyncOutcome>, ApiError> {
    let layer = parse_layer(&layer)?;
    let handle = FeatureHandle::from_str(&handle)
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid feature handle".to_string()))?;
    let mut engine = state.engine.lock().await;
    ensure_unblocked(&engine)?;
    ensure_mode(&engine, layer, ToolMode::AwaitingDelete)?;
    if !engine.map_mut().remove_feature(layer, handle) {
        return Err((StatusCode::NOT_FOUND, format!("no shape {} on {}", handle, layer)));
    }
    let outcome = engine.on_layer_changed(layer).map_err(sync_error)?;
    Ok(Json(outcome))
}

async fn render_table<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
    Path(layer): Path<String>,
    Query(query): Query<TableQuery>,
) -> Result<Json<TableView>, ApiError> {
    let layer = parse_layer(&layer)?;
    let mut engine = state.engine.lock().await;
    let view = engine
        .render_table(layer, query.editable)
        .map_err(sync_error)?;
    Ok(Json(view))
}

async fn edit_cell<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
    Path(layer): Path<String>,
    Json(request): Json<CellEditRequest>,
) -> Result<Json<TableView>, ApiError> {
    let layer = parse_layer(&layer)?;
    let mut engine = state.engine.lock().await;
    ensure_unblocked(&engine)?;
    let displayed = engine
        .state()
        .displayed()
        .is_some_and(|displayed| displayed.layer == layer);
    if !displayed {
        return Err((
            StatusCode::CONFLICT,
            format!("the {} table is not displayed", layer),
        ));
    }
    let table = engine.table_mut();
    if !table.edit_cell(request.row, &request.field, &request.value) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "cannot edit row {} field '{}' of the {} table",
                request.row, request.field, layer
            ),
        ));
    }
    table
        .view()
        .cloned()
        .map(Json)
        .ok_or_else(|| (StatusCode::CONFLICT, "no table is displayed".to_string()))
}

async fn save_layer<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
    Path(layer): Path<String>,
) -> Result<Json<Vec<FeatureRecord>>, ApiError> {
    let layer = parse_layer(&layer)?;
    let mut engine = state.engine.lock().await;
    let records = engine.save_layer(layer).map_err(sync_error)?;
    Ok(Json(records))
}

async fn import_layer<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
    Path(layer): Path<String>,
    Json(records): Json<Vec<FeatureRecord>>,
) -> Result<Json<ImportResponse>, ApiError> {
    let layer = parse_layer(&layer)?;
    let mut engine = state.engine.lock().await;
    let imported = engine.import_layer(layer, &records).map_err(sync_error)?;
    Ok(Json(ImportResponse { imported }))
}

async fn set_style<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
    Path(layer): Path<String>,
    Json(request): Json<StyleRequest>,
) -> Result<Json<LayerSummary>, ApiError> {
    let layer = parse_layer(&layer)?;
    let mut engine = state.engine.lock().await;
    engine
        .set_layer_color(layer, &request.color)
        .map_err(sync_error)?;
    Ok(Json(summarize(&engine, layer)))
}

async fn solve<S: SessionCache + 'static, C: Solver + 'static>(
    State(state): State<WorkspaceState<S, C>>,
) -> Result<Json<SolveResponse>, ApiError> {
    let engine = Arc::clone(&state.engine);
    let solver = Arc::clone(&state.solver);
    let outcome = tokio::spawn(async move { run_solve(&engine, solver.as_ref()).await })
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("solve task failed: {}", e),
            )
        })?
        .map_err(sync_error)?;
    let notices = state.engine.lock().await.take_notices();
    Ok(Json(SolveResponse { outcome, notices }))
}

async fn get_overlays<S: SessionCache, C: Solver>(
    State(state): State<WorkspaceState<S, C>>,
) -> Json<Vec<ContourOverlay>> {
    let engine = state.engine.lock().await;
    Json(engine.map().overlays().to_vec())
}

/// Creates the HTTP router for a workspace.
pub fn create_workspace_router<S, C>(
    engine: Arc<Mutex<WorkspaceEngine<S>>>,
    solver: Arc<C>,
) -> Router
where
    S: SessionCache + 'static,
    C: Solver + 'static,
{
    Router::new()
        .route("/layer", get(list_layers::<S, C>))
        .route("/layer/:layer", get(get_layer::<S, C>))
        .route("/layer/:layer/tool", post(select_tool::<S, C>))
        .route("/layer/:layer/feature", post(draw_feature::<S, C>))
        .route("/layer/:layer/feature/:handle", delete(delete_feature::<S, C>))
        .route("/layer/:layer/table", get(render_table::<S, C>))
        .route("/layer/:layer/table/cell", put(edit_cell::<S, C>))
        .route("/layer/:layer/save", post(save_layer::<S, C>))
        .route("/layer/:layer/import", post(import_layer::<S, C>))
        .route("/layer/:layer/style", put(set_style::<S, C>))
        .route("/solve", post(solve::<S, C>))
        .route("/overlay", get(get_overlays::<S, C>))
        .with_state(WorkspaceState { engine, solver })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{SolverError, SolverResponse};
    use crate::submission::SolverSubmission;
    use crate::InMemorySessionCache;
    use axum_test::TestServer;
    use serde_json::json;

    struct CannedSolver;

    impl Solver for CannedSolver {
        async fn solve(&self, _: &SolverSubmission) -> Result<SolverResponse, SolverError> {
            Ok(SolverResponse {
                heads: Some(json!([10.0, 11.0])),
                contours: Some(json!([{
                    "type": "Feature",
                    "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
                    "properties": {"elevation": 11.0}
                }])),
                error: None,
            })
        }
    }

    fn server() -> (TestServer, Arc<Mutex<WorkspaceEngine<InMemorySessionCache>>>) {
        let engine = Arc::new(Mutex::new(SyncEngine::new(
            InMemoryMap::new(),
            InMemoryTable::new(),
            InMemorySessionCache::new(),
        )));
        let router = create_workspace_router(engine.clone(), Arc::new(CannedSolver));
        (TestServer::new(router).unwrap(), engine)
    }

    async fn select(server: &TestServer, layer: &str, tool: &str) {
        server
            .post(&format!("/layer/{}/tool", layer))
            .json(&json!({"tool": tool}))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn lists_every_layer() {
        let (server, _) = server();
        let response = server.get("/layer").await;
        response.assert_status_ok();
        let layers: Vec<LayerSummary> = response.json();
        assert_eq!(layers.len(), 8);
        assert_eq!(layers[1].slug, "wells");
        assert_eq!(layers[1].mode, ToolMode::Idle);
    }

    #[tokio::test]
    async fn unknown_layers_are_not_found() {
        let (server, _) = server();
        server
            .get("/layer/rivers")
            .expect_failure()
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn draw_and_delete_through_the_api() {
        let (server, _) = server();
        select(&server, "wells", "draw_point").await;
        for x in [0.0, 1.0, 2.0] {
            let response = server
                .post("/layer/wells/feature")
                .json(&json!({"geometry": {"type": "Point", "coordinates": [x, 0.0]}}))
                .await;
            response.assert_status_ok();
        }
        let detail: LayerDetail = server.get("/layer/wells").await.json();
        assert_eq!(detail.summary.count, 3);
        let middle = detail.features[1].handle;

        select(&server, "wells", "delete").await;
        let outcome: SyncOutcome = server
            .delete(&format!("/layer/wells/feature/{}", middle))
            .await
            .json();
        assert_eq!(outcome, SyncOutcome::Deleted(vec![2]));

        let detail: LayerDetail = server.get("/layer/wells").await.json();
        let labels: Vec<&str> = detail
            .features
            .iter()
            .map(|f| f.attributes["Label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["Well_1", "Well_3"]);
        assert_eq!(detail.features[1].id, 2);
    }

    #[tokio::test]
    async fn shapes_need_the_matching_tool() {
        let (server, engine) = server();
        let point = json!({"geometry": {"type": "Point", "coordinates": [0.0, 0.0]}});
        server
            .post("/layer/wells/feature")
            .json(&point)
            .expect_failure()
            .await
            .assert_status(StatusCode::CONFLICT);
        assert!(engine.lock().await.map().features(LayerKind::Wells).is_empty());

        select(&server, "wells", "draw_point").await;
        let drawn: DrawFeatureResponse = server.post("/layer/wells/feature").json(&point).await.json();
        assert_eq!(drawn.outcome, SyncOutcome::Added(vec![1]));

        server
            .delete(&format!("/layer/wells/feature/{}", drawn.handle))
            .expect_failure()
            .await
            .assert_status(StatusCode::CONFLICT);
        select(&server, "wells", "pan").await;
        server
            .post("/layer/wells/feature")
            .json(&point)
            .expect_failure()
            .await
            .assert_status(StatusCode::CONFLICT);

        let engine = engine.lock().await;
        assert_eq!(engine.map().features(LayerKind::Wells).len(), 1);
        assert_eq!(engine.features(LayerKind::Wells).len(), 1);
    }

    #[tokio::test]
    async fn pending_shapes_do_not_block_later_draws() {
        let (server, _) = server();
        select(&server, "wells", "draw_point").await;
        let pending: DrawFeatureResponse = server
            .post("/layer/wells/feature")
            .json(&json!({"geometry": null}))
            .await
            .json();
        assert_eq!(pending.outcome, SyncOutcome::Deferred);

        let drawn: DrawFeatureResponse = server
            .post("/layer/wells/feature")
            .json(&json!({"geometry": {"type": "Point", "coordinates": [1.0, 1.0]}}))
            .await
            .json();
        assert_eq!(drawn.outcome, SyncOutcome::Added(vec![1]));
        let detail: LayerDetail = server.get("/layer/wells").await.json();
        assert_eq!(detail.summary.count, 1);
    }

    #[tokio::test]
    async fn cell_edits_need_a_displayed_editable_table() {
        let (server, _) = server();
        select(&server, "wells", "draw_point").await;
        server
            .post("/layer/wells/feature")
            .json(&json!({"geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}))
            .await
            .assert_status_ok();
        let edit = json!({"row": 0, "field": "Qw", "value": "75"});
        server
            .put("/layer/wells/table/cell")
            .json(&edit)
            .expect_failure()
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .get("/layer/wells/table")
            .add_query_param("editable", true)
            .await
            .assert_status_ok();
        let view: TableView = server.put("/layer/wells/table/cell").json(&edit).await.json();
        assert_eq!(view.rows[0][1], "75");

        let records: Vec<FeatureRecord> = server.post("/layer/wells/save").await.json();
        assert_eq!(records[0].fields["Qw"], "75");
    }

    #[tokio::test]
    async fn solve_without_constant_is_unprocessable() {
        let (server, _) = server();
        let response = server.post("/solve").expect_failure().await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.text(), "Make sure that you have only one constant");
    }

    #[tokio::test]
    async fn solve_draws_the_overlay() {
        let (server, engine) = server();
        select(&server, "constant-and-model", "draw_point").await;
        server
            .post("/layer/constant-and-model/feature")
            .json(&json!({"geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}))
            .await
            .assert_status_ok();
        let response: SolveResponse = server.post("/solve").await.json();
        assert_eq!(
            response.outcome,
            SolveOutcome::Rendered {
                levels: vec![10.0, 11.0],
                contours: 1
            }
        );
        let overlays: Vec<ContourOverlay> = server.get("/overlay").await.json();
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].lines[0].color.to_string(), "#aa0114");
        assert!(!engine.lock().await.is_input_blocked());
    }

    #[tokio::test]
    async fn blocked_engines_answer_locked() {
        let (server, engine) = server();
        select(&server, "constant-and-model", "draw_point").await;
        server
            .post("/layer/constant-and-model/feature")
            .json(&json!({"geometry": {"type": "Point", "coordinates": [0.0, 0.0]}}))
            .await
            .assert_status_ok();
        engine.lock().await.begin_solve().unwrap();
        server
            .post("/layer/wells/tool")
            .json(&json!({"tool": "draw_point"}))
            .expect_failure()
            .await
            .assert_status(StatusCode::LOCKED);
        server
            .post("/layer/wells/feature")
            .json(&json!({"geometry": {"type": "Point", "coordinates": [1.0, 0.0]}}))
            .expect_failure()
            .await
            .assert_status(StatusCode::LOCKED);
    }

    #[tokio::test]
    async fn style_changes_are_reported() {
        let (server, _) = server();
        let summary: LayerSummary = server
            .put("/layer/polygon-inhom/style")
            .json(&json!({"color": "#00ff00"}))
            .await
            .json();
        assert_eq!(summary.color, "#00ff00");
    }
}
