//! # Solve Command Handler
//!
//! Checks the saved model, shows the request it becomes and runs it through the
//! solver.

use serde::Serialize;

use crate::cli_utils::{self, OutputFormat};
use crate::commands::shared::{
    LocalEngine, Workspace, dispatch_command, or_exit, validate_args_count_or_exit,
};
use crate::{
    Feature, LayerKind, MapSurface, SolveOutcome, SolverClient, SolverSubmission, run_solve,
    validate_model,
};

const SOLVE_USAGE: &str = "Usage: wellctl solve <check|submission|run> [args...]";

#[derive(Debug, Serialize)]
struct SolveReport {
    outcome: SolveOutcome,
    notices: Vec<String>,
    overlays: Vec<crate::ContourOverlay>,
}

/// Handles all solve-related commands.
pub async fn handle_solve_command(args: &[String], workspace: &Workspace, output: OutputFormat) {
    dispatch_command!("solve", SOLVE_USAGE, args, workspace, output, {
        "check" => handle_solve_check,
        "submission" => handle_solve_submission,
        "run" => handle_solve_run,
    });
}

fn layers(engine: &LocalEngine) -> Vec<(LayerKind, &[Feature])> {
    engine
        .state()
        .layers()
        .iter()
        .map(|state| (state.kind(), state.features()))
        .collect()
}

async fn handle_solve_check(args: &[String], workspace: &Workspace, _output: OutputFormat) {
    validate_args_count_or_exit(args, 1, 1, "check", "Usage: wellctl solve check");
    let engine = workspace.open_engine_or_exit();
    if let Err(e) = validate_model(layers(&engine)) {
        cli_utils::exit_with_error(&e.to_string());
    }
    let total: usize = engine.state().layers().iter().map(|state| state.count()).sum();
    cli_utils::print_success(&format!("Model is ready to solve ({} features)", total));
}

async fn handle_solve_submission(args: &[String], workspace: &Workspace, output: OutputFormat) {
    validate_args_count_or_exit(args, 1, 1, "submission", "Usage: wellctl solve submission");
    let engine = workspace.open_engine_or_exit();
    match SolverSubmission::build(layers(&engine), engine.map().viewport()) {
        Ok(submission) => cli_utils::print_formatted_or_exit(&submission, output, "submission"),
        Err(e) => cli_utils::exit_with_error(&e.to_string()),
    }
}

async fn handle_solve_run(args: &[String], workspace: &Workspace, output: OutputFormat) {
    validate_args_count_or_exit(args, 1, 1, "run", "Usage: wellctl [--base-url <url>] solve run");
    let solver = SolverClient::new(&workspace.config.solver);
    let engine = tokio::sync::Mutex::new(workspace.open_engine_or_exit());
    let outcome = or_exit(run_solve(&engine, &solver).await);
    let mut engine = engine.into_inner();
    let report = SolveReport {
        outcome,
        notices: engine.take_notices(),
        overlays: engine.map().overlays().to_vec(),
    };
    cli_utils::print_formatted_or_exit(&report, output, "solve result");
}
