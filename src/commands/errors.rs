//! # Command Error Handling
//!
//! Error types from the library are turned into a message plus an optional hint
//! for wellctl users through the handled crate.

use handled::Handle;

use crate::engine::SyncError;
use crate::solver::SolverError;
use crate::{CodecError, LayerKind, LayerParseError, SessionError};

/// User-friendly error information that can be extracted from various error types
#[derive(Debug, Clone)]
pub struct UserError {
    /// The main error message to display to the user
    pub message: String,
    /// Optional usage hint to help the user correct the error
    pub usage_hint: Option<String>,
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Implements Handle<UserError> for itself to allow extraction
impl Handle<UserError> for UserError {
    fn handle(&self) -> Option<UserError> {
        Some(self.clone())
    }
}

impl Handle<UserError> for LayerParseError {
    fn handle(&self) -> Option<UserError> {
        let names: Vec<String> = LayerKind::ALL.iter().map(|kind| kind.slug()).collect();
        Some(UserError {
            message: format!("Unknown layer '{}'", self.input),
            usage_hint: Some(format!("Layers: {}", names.join(", "))),
        })
    }
}

impl Handle<UserError> for SessionError {
    fn handle(&self) -> Option<UserError> {
        let usage_hint = match self {
            SessionError::Io(_) => Some("Check that the session file is writable".to_string()),
            SessionError::Corrupt(_) => Some(
                "The session file is not a JSON object; run 'wellctl session clear' to start over"
                    .to_string(),
            ),
        };
        Some(UserError {
            message: format!("Session error: {}", self),
            usage_hint,
        })
    }
}

impl Handle<UserError> for CodecError {
    fn handle(&self) -> Option<UserError> {
        Some(UserError {
            message: format!("Cannot read features: {}", self),
            usage_hint: Some(
                "Records need 'geometryType' and 'coordinates' matching the layer's geometry"
                    .to_string(),
            ),
        })
    }
}

impl Handle<UserError> for SyncError {
    fn handle(&self) -> Option<UserError> {
        match self {
            SyncError::Codec(e) => e.handle(),
            SyncError::Session(e) => e.handle(),
            SyncError::Validation(e) => Some(UserError {
                message: e.to_string(),
                usage_hint: Some("Run 'wellctl solve check' after fixing the model".to_string()),
            }),
            SyncError::InputBlocked => Some(UserError {
                message: self.to_string(),
                usage_hint: None,
            }),
        }
    }
}

impl Handle<UserError> for SolverError {
    fn handle(&self) -> Option<UserError> {
        let usage_hint = match self {
            SolverError::Transport(_) | SolverError::Timeout => Some(
                "Check that the solver is running and reachable at the configured base_url"
                    .to_string(),
            ),
            SolverError::Http {
                status: 500..=599, ..
            } => Some("Server error. The solver may be temporarily unavailable.".to_string()),
            _ => None,
        };
        Some(UserError {
            message: self.to_string(),
            usage_hint,
        })
    }
}

/// Implement Handle<UserError> for serde_json::Error
impl Handle<UserError> for serde_json::Error {
    fn handle(&self) -> Option<UserError> {
        Some(UserError {
            message: format!("JSON parsing error: {}", self),
            usage_hint: Some(
                "Ensure the JSON is properly formatted and contains all required fields"
                    .to_string(),
            ),
        })
    }
}

/// Implement Handle<UserError> for std::io::Error
impl Handle<UserError> for std::io::Error {
    fn handle(&self) -> Option<UserError> {
        let usage_hint = match self.kind() {
            std::io::ErrorKind::NotFound => Some("Check that the file path exists".to_string()),
            std::io::ErrorKind::PermissionDenied => {
                Some("Check the file permissions".to_string())
            }
            _ => None,
        };
        Some(UserError {
            message: format!("I/O error: {}", self),
            usage_hint,
        })
    }
}

/// Enhanced error formatting for CLI output
pub fn format_cli_error<E>(error: &E) -> String
where
    E: Handle<UserError> + std::fmt::Display,
{
    if let Some(user_error) = error.handle() {
        let mut output = format!("Error: {}", user_error.message);
        if let Some(hint) = user_error.usage_hint {
            output.push_str(&format!("\nHint: {}", hint));
        }
        output
    } else {
        format!("Error: {}", error)
    }
}
