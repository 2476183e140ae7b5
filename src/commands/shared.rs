//! # Shared Command Utilities
//!
//! Argument checks, error exits and the local workspace every wellctl command
//! works on.

use std::path::PathBuf;
use std::str::FromStr;

use handled::Handle;

use crate::commands::errors::{UserError, format_cli_error};
use crate::{
    FileSessionCache, InMemoryMap, InMemoryTable, Journal, LayerKind, SyncEngine, WellheadConfig,
    cli_utils,
};

/// The engine wellctl drives: headless surfaces over the session file.
pub type LocalEngine = SyncEngine<InMemoryMap, InMemoryTable, FileSessionCache>;

/// Configuration of one wellctl invocation.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Loaded configuration with command-line overrides applied.
    pub config: WellheadConfig,
}

impl Workspace {
    /// Wraps a configuration.
    pub fn new(config: WellheadConfig) -> Self {
        Self { config }
    }

    /// The session file in use.
    pub fn session_path(&self) -> &PathBuf {
        &self.config.session_path
    }

    /// Opens the session file and restores every layer from it.
    pub fn open_engine_or_exit(&self) -> LocalEngine {
        let session = or_exit(FileSessionCache::open(&self.config.session_path));
        let mut engine = SyncEngine::new(InMemoryMap::new(), InMemoryTable::new(), session)
            .with_journal(Journal::durable(self.config.journal_path.clone()));
        engine.initialize();
        engine
    }
}

/// Unwraps a result or exits with the error's user-facing message and hint.
pub fn or_exit<T, E>(result: Result<T, E>) -> T
where
    E: Handle<UserError> + std::fmt::Display,
{
    result.unwrap_or_else(|e| {
        eprintln!("{}", format_cli_error(&e));
        std::process::exit(1);
    })
}

/// Parses a layer name or slug, exiting with the list of layers on failure.
pub fn parse_layer_or_exit(layer: &str) -> LayerKind {
    or_exit(LayerKind::from_str(layer))
}

/// Validates both minimum and maximum argument counts.
///
/// # Arguments
/// * `args` - The command arguments array
/// * `min_count` - The minimum number of arguments required (including subcommand)
/// * `max_count` - The maximum number of arguments allowed (including subcommand)
/// * `command` - The command name for error message
/// * `usage` - The usage string to display
pub fn validate_args_count_or_exit(
    args: &[String],
    min_count: usize,
    max_count: usize,
    command: &str,
    usage: &str,
) {
    if args.len() < min_count {
        cli_utils::exit_with_usage_error(
            &format!("{} command requires more arguments", command),
            usage,
        );
    }
    if args.len() > max_count {
        cli_utils::exit_with_usage_error(
            &format!("{} command has too many arguments", command),
            usage,
        );
    }
}

/// Macro to generate command dispatcher boilerplate.
macro_rules! dispatch_command {
    ($command_name:expr, $usage:expr, $args:expr, $workspace:expr, $output_format:expr, {
        $($subcommand:expr => $handler:expr),* $(,)?
    }) => {
        if $args.is_empty() {
            crate::cli_utils::exit_with_usage_error(
                &format!("{} command requires a subcommand", $command_name),
                $usage,
            );
        }

        match $args[0].as_str() {
            $(
                $subcommand => $handler($args, $workspace, $output_format).await,
            )*
            _ => {
                let available_subcommands = vec![$($subcommand),*];
                crate::cli_utils::exit_with_error(&format!(
                    "Unknown {} subcommand '{}'. Available subcommands: {}",
                    $command_name,
                    $args[0],
                    available_subcommands.join(", ")
                ));
            }
        }
    };
}

pub(crate) use dispatch_command;
