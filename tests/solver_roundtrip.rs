use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use wellhead::{
    CONTOUR_TITLE, Geometry, InMemoryMap, InMemorySessionCache, InMemoryTable, LEVELS_KEY,
    LayerKind, MapSurface, SessionCache, SolveOutcome, SolverClient, SolverConfig, SyncEngine,
    SyncError, Tool, run_solve,
};

type Engine = SyncEngine<InMemoryMap, InMemoryTable, InMemorySessionCache>;
type Requests = Arc<Mutex<Vec<HashMap<String, String>>>>;

const CONTOURS: &str = r#"[
    {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0, 0], [5, 5]]}, "properties": {"elevation": 0}},
    {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[1, 0], [6, 5]]}, "properties": {"elevation": 2}}
]"#;

async fn solve_ok(
    State(requests): State<Requests>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    requests.lock().await.push(params);
    Json(json!({ "heads": "[0, 1, 2]", "contours": CONTOURS }))
}

async fn solve_slow(
    State(requests): State<Requests>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    requests.lock().await.push(params);
    tokio::time::sleep(Duration::from_millis(600)).await;
    Json(json!({ "heads": [0, 1, 2], "contours": CONTOURS }))
}

async fn solve_hang(State(requests): State<Requests>) -> Json<Value> {
    requests.lock().await.push(HashMap::new());
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({}))
}

async fn solve_reports_error() -> Json<Value> {
    Json(json!({ "error": "matrix is singular" }))
}

async fn solve_crashes() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "traceback")
}

/// Starts a fake solver on an ephemeral port and returns its base URL.
async fn fake_solver() -> (String, Requests) {
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/solve", get(solve_ok))
        .route("/slow", get(solve_slow))
        .route("/hang", get(solve_hang))
        .route("/error", get(solve_reports_error))
        .route("/crash", get(solve_crashes))
        .with_state(requests.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), requests)
}

/// A solver that sends its headers and part of the body, then goes silent.
async fn stalling_solver() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 8192];
                let _ = socket.read(&mut request).await;
                let head = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 4096\r\n\r\n";
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(b"{\"heads\": [0, ").await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    format!("http://{}", addr)
}

fn client(base_url: &str, endpoint: &str, timeout_secs: u64) -> SolverClient {
    SolverClient::new(&SolverConfig {
        base_url: base_url.to_string(),
        endpoint: endpoint.to_string(),
        timeout_secs,
    })
}

fn draw(engine: &mut Engine, layer: LayerKind, geometry: Geometry) {
    engine.select_tool(layer, Tool::Draw).unwrap();
    engine.map_mut().add_feature(layer, Some(geometry));
    engine.on_layer_changed(layer).unwrap();
}

fn model() -> Engine {
    let mut engine = SyncEngine::new(
        InMemoryMap::new(),
        InMemoryTable::new(),
        InMemorySessionCache::new(),
    );
    draw(&mut engine, LayerKind::ConstantModel, Geometry::Point([0.0, 0.0]));
    draw(&mut engine, LayerKind::Wells, Geometry::Point([3.0, 4.0]));
    draw(
        &mut engine,
        LayerKind::HeadLineSinks,
        Geometry::LineString(vec![[0.0, 0.0], [10.0, 0.0]]),
    );
    engine
}

#[tokio::test]
async fn solve_renders_one_contour_overlay() {
    let (base_url, requests) = fake_solver().await;
    let solver = client(&base_url, "solve", 10);
    let engine = Mutex::new(model());

    for _ in 0..2 {
        let outcome = run_solve(&engine, &solver).await.unwrap();
        assert_eq!(
            outcome,
            SolveOutcome::Rendered {
                levels: vec![0.0, 1.0, 2.0],
                contours: 2
            }
        );
    }

    let engine = engine.into_inner();
    let overlays = engine.map().overlays();
    assert_eq!(overlays.len(), 1);
    assert_eq!(overlays[0].title, CONTOUR_TITLE);
    assert_eq!(overlays[0].lines[0].color.to_string(), "#000000");
    assert_eq!(overlays[0].lines[1].color.to_string(), "#c46400");
    assert_eq!(engine.session().get(LEVELS_KEY).as_deref(), Some("[0, 1, 2]"));
    assert!(!engine.is_input_blocked());

    let requests = requests.lock().await;
    assert_eq!(requests.len(), 2);
    let params = &requests[0];
    let wells: Value = serde_json::from_str(&params["wells"]).unwrap();
    assert_eq!(wells["well_0"]["label"], "Well_1");
    assert_eq!(wells["well_0"]["coordinates"], json!([3.0, 4.0]));
    let lines: Value = serde_json::from_str(&params["head_line_sink"]).unwrap();
    assert_eq!(lines["head_line_sink_0"]["label"], "HeadLineSink_1");
    let corners: Vec<f64> = serde_json::from_str(&params["map_corners"]).unwrap();
    assert_eq!(corners.len(), 4);
    assert_eq!(params["uflow"], "{}");
}

#[tokio::test]
async fn three_vertex_lines_never_reach_the_solver() {
    let (base_url, requests) = fake_solver().await;
    let solver = client(&base_url, "solve", 10);
    let mut engine = model();
    draw(
        &mut engine,
        LayerKind::LineSinks,
        Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]),
    );
    let before = engine.state().clone();
    let engine = Mutex::new(engine);

    match run_solve(&engine, &solver).await {
        Err(SyncError::Validation(e)) => assert_eq!(
            e.to_string(),
            "Feature 'LineSink_1' has more than 2 vertices. Please break up your feature to have only 2 vertices"
        ),
        other => panic!("expected a validation error, got {:?}", other),
    }
    assert!(requests.lock().await.is_empty());

    let mut engine = engine.into_inner();
    assert_eq!(engine.state(), &before);
    assert_eq!(engine.take_notices().len(), 1);
    assert!(engine.map().overlays().is_empty());
}

#[tokio::test]
async fn constants_must_be_unique() {
    let (base_url, requests) = fake_solver().await;
    let solver = client(&base_url, "solve", 10);

    let empty = Mutex::new(SyncEngine::new(
        InMemoryMap::new(),
        InMemoryTable::new(),
        InMemorySessionCache::new(),
    ));
    assert!(matches!(
        run_solve(&empty, &solver).await,
        Err(SyncError::Validation(_))
    ));

    let mut doubled = model();
    draw(&mut doubled, LayerKind::ConstantModel, Geometry::Point([9.0, 9.0]));
    let doubled = Mutex::new(doubled);
    match run_solve(&doubled, &solver).await {
        Err(SyncError::Validation(e)) => {
            assert_eq!(e.to_string(), "Make sure that you have only one constant")
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
    assert!(requests.lock().await.is_empty());
}

#[tokio::test]
async fn input_is_blocked_until_the_solver_answers() {
    let (base_url, _requests) = fake_solver().await;
    let solver = client(&base_url, "slow", 10);
    let engine = Arc::new(Mutex::new(model()));

    let task = {
        let engine = engine.clone();
        tokio::spawn(async move { run_solve(&engine, &solver).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    {
        let mut engine = engine.lock().await;
        assert!(engine.is_input_blocked());
        assert!(matches!(
            engine.select_tool(LayerKind::Wells, Tool::Draw),
            Err(SyncError::InputBlocked)
        ));
        assert!(matches!(
            engine.render_table(LayerKind::Wells, true),
            Err(SyncError::InputBlocked)
        ));
    }

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, SolveOutcome::Rendered { contours: 2, .. }));
    let mut engine = engine.lock().await;
    assert!(!engine.is_input_blocked());
    engine.select_tool(LayerKind::Wells, Tool::Draw).unwrap();
}

#[tokio::test]
async fn timeouts_release_the_guard() {
    let (base_url, requests) = fake_solver().await;
    let solver = client(&base_url, "hang", 1);
    let engine = Mutex::new(model());

    let outcome = run_solve(&engine, &solver).await.unwrap();
    match outcome {
        SolveOutcome::Failed(message) => assert!(message.contains("did not respond")),
        other => panic!("expected a failure, got {:?}", other),
    }
    assert_eq!(requests.lock().await.len(), 1);
    let engine = engine.into_inner();
    assert!(!engine.is_input_blocked());
    assert!(engine.map().overlays().is_empty());
}

#[tokio::test]
async fn stalled_bodies_time_out() {
    let base_url = stalling_solver().await;
    let engine = Mutex::new(model());

    let started = std::time::Instant::now();
    let outcome = run_solve(&engine, &client(&base_url, "solve", 1))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
    match outcome {
        SolveOutcome::Failed(message) => assert!(message.contains("did not respond")),
        other => panic!("expected a failure, got {:?}", other),
    }
    let engine = engine.into_inner();
    assert!(!engine.is_input_blocked());
    assert!(engine.map().overlays().is_empty());
}

#[tokio::test]
async fn abandoned_solves_unblock_input() {
    let (base_url, requests) = fake_solver().await;
    let solver = client(&base_url, "hang", 10);
    let engine = Mutex::new(model());

    let abandoned = tokio::time::timeout(Duration::from_millis(300), run_solve(&engine, &solver)).await;
    assert!(abandoned.is_err());
    assert_eq!(requests.lock().await.len(), 1);

    let mut engine = engine.lock().await;
    assert!(!engine.is_input_blocked());
    engine.select_tool(LayerKind::Wells, Tool::Draw).unwrap();
    assert!(engine.map().overlays().is_empty());
}

#[tokio::test]
async fn solver_errors_are_reported() {
    let (base_url, _requests) = fake_solver().await;
    let engine = Mutex::new(model());

    let outcome = run_solve(&engine, &client(&base_url, "error", 10))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SolveOutcome::SolverReported("matrix is singular".to_string())
    );

    let outcome = run_solve(&engine, &client(&base_url, "crash", 10))
        .await
        .unwrap();
    match outcome {
        SolveOutcome::Failed(message) => assert!(message.contains("HTTP 500")),
        other => panic!("expected a failure, got {:?}", other),
    }

    let engine = engine.into_inner();
    assert!(!engine.is_input_blocked());
    assert!(engine.map().overlays().is_empty());
}

#[tokio::test]
async fn unreachable_solvers_fail_cleanly() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let engine = Mutex::new(model());
    let outcome = run_solve(&engine, &client(&format!("http://{}", addr), "solve", 5))
        .await
        .unwrap();
    assert!(matches!(outcome, SolveOutcome::Failed(_)));
    assert!(!engine.into_inner().is_input_blocked());
}
