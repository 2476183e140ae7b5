//! # Session Command Handler
//!
//! Moves layer snapshots in and out of the session file.

use crate::cli_utils::{self, OutputFormat};
use crate::commands::shared::{
    Workspace, dispatch_command, or_exit, parse_layer_or_exit, validate_args_count_or_exit,
};
use crate::{FeatureRecord, SessionCache};

const SESSION_USAGE: &str = "Usage: wellctl session <export|import|clear> [args...]";

/// Handles all session-related commands.
pub async fn handle_session_command(
    args: &[String],
    workspace: &Workspace,
    output: OutputFormat,
) {
    dispatch_command!("session", SESSION_USAGE, args, workspace, output, {
        "export" => handle_session_export,
        "import" => handle_session_import,
        "clear" => handle_session_clear,
    });
}

async fn handle_session_export(args: &[String], workspace: &Workspace, output: OutputFormat) {
    validate_args_count_or_exit(args, 2, 2, "export", "Usage: wellctl session export <layer>");
    let layer = parse_layer_or_exit(&args[1]);
    let mut engine = workspace.open_engine_or_exit();
    let records = or_exit(engine.export_layer(layer));
    cli_utils::print_formatted_or_exit(&records, output, "feature records");
}

async fn handle_session_import(args: &[String], workspace: &Workspace, _output: OutputFormat) {
    validate_args_count_or_exit(
        args,
        3,
        3,
        "import",
        "Usage: wellctl session import <layer> <file.json>",
    );
    let layer = parse_layer_or_exit(&args[1]);
    let content = or_exit(std::fs::read_to_string(&args[2]));
    let records: Vec<FeatureRecord> = or_exit(serde_json::from_str(&content));
    let mut engine = workspace.open_engine_or_exit();
    let imported = or_exit(engine.import_layer(layer, &records));
    cli_utils::print_success(&format!(
        "Imported {} feature(s) into {} ({})",
        imported,
        layer,
        workspace.session_path().display()
    ));
}

async fn handle_session_clear(args: &[String], workspace: &Workspace, _output: OutputFormat) {
    validate_args_count_or_exit(args, 1, 1, "clear", "Usage: wellctl session clear");
    let mut engine = workspace.open_engine_or_exit();
    or_exit(engine.session_mut().clear());
    cli_utils::print_success(&format!(
        "Cleared session {}",
        workspace.session_path().display()
    ));
}
