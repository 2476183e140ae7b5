//! # Command Handlers
//!
//! Command handlers for the wellctl CLI.  wellctl works directly on a session
//! file, so every command restores the layers from it, acts, and lets the engine
//! write back whatever changed.
//!
//! ## Structure
//!
//! - `layer` - Layer registry and saved feature views (list, schema, show)
//! - `session` - Snapshot transfer (export, import, clear)
//! - `solve` - Model validation and solver runs (check, submission, run)
//! - `shared` - Shared utilities and the workspace handle

pub mod errors;
pub mod layer;
pub mod session;
pub mod shared;
pub mod solve;

pub use layer::handle_layer_command;
pub use session::handle_session_command;
pub use shared::Workspace;
pub use solve::handle_solve_command;
