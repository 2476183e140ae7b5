use std::path::PathBuf;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use wellhead::{
    WellheadConfig,
    cli_utils::{self, OutputFormat},
    commands::{Workspace, handle_layer_command, handle_session_command, handle_solve_command},
    load_config,
};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Options {
    #[arrrg(optional, "YAML or JSON configuration file")]
    config: String,
    #[arrrg(optional, "Session file holding layer snapshots")]
    session: String,
    #[arrrg(optional, "Base URL of the solver service")]
    base_url: String,
    #[arrrg(optional, "Output format: json or yaml (default: json)")]
    output: OutputFormat,
}

const USAGE: &str = r#"Usage: wellctl [options] <command> [args...]

Options:
  --config <file>      YAML or JSON configuration file
  --session <file>     Session file holding layer snapshots (default: wellhead-session.json)
  --base-url <url>     Base URL of the solver service (default: http://127.0.0.1:5000)
  --output <format>    Output format: json or yaml (default: json)

Commands:
  layer list                          List layers with their colors and feature counts
  layer schema <layer>                Show a layer's geometry and attribute fields
  layer show <layer>                  Show a layer's saved features
  session export <layer>              Print a layer's snapshot records
  session import <layer> <file.json>  Replace a layer's features with records from a file
  session clear                       Remove every snapshot and style from the session
  solve check                         Check that the model can be submitted
  solve submission                    Print the request the solver would receive
  solve run                           Run the solver and print the contour overlay"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (options, free) = Options::from_command_line_relaxed("USAGE: wellctl <command> [args...]");

    if free.is_empty() {
        cli_utils::exit_with_usage_error("No command specified", USAGE);
    }

    let mut config = if options.config.is_empty() {
        WellheadConfig::default()
    } else {
        load_config(&PathBuf::from(&options.config))
            .unwrap_or_else(|e| cli_utils::exit_with_error(&e))
    };
    if !options.session.is_empty() {
        config.session_path = PathBuf::from(&options.session);
    }
    if !options.base_url.is_empty() {
        config.solver.base_url = options.base_url.clone();
    }
    let workspace = Workspace::new(config);

    match free[0].as_str() {
        "layer" => {
            handle_layer_command(&free[1..], &workspace, options.output).await;
        }
        "session" => {
            handle_session_command(&free[1..], &workspace, options.output).await;
        }
        "solve" => {
            handle_solve_command(&free[1..], &workspace, options.output).await;
        }
        "help" => {
            println!("{}", USAGE);
        }
        _ => {
            cli_utils::exit_with_error(&format!(
                "Unknown command '{}'. Available commands: layer, session, solve",
                free[0]
            ));
        }
    }

    Ok(())
}
