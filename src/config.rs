//! Configuration for the wellhead daemon and CLI.
//!
//! Configuration lives in a YAML or JSON file, chosen by extension.  Every field
//! has a default, so an empty file (or no file at all) is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where and how to reach the solver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SolverConfig {
    /// Scheme, host and port of the solver service.
    pub base_url: String,
    /// Path of the solve endpoint.
    pub endpoint: String,
    /// Seconds to wait for an answer before giving up.
    pub timeout_secs: u64,
}

impl SolverConfig {
    /// `<base_url>/<endpoint>` with exactly one slash between them.
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            endpoint: "solve".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WellheadConfig {
    /// Solver connection.
    pub solver: SolverConfig,
    /// File backing the session cache.
    pub session_path: PathBuf,
    /// JSONL journal of engine events.
    pub journal_path: PathBuf,
    /// Address the daemon binds to.
    pub host: String,
    /// Port the daemon listens on.
    pub port: u16,
}

impl Default for WellheadConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            session_path: PathBuf::from("wellhead-session.json"),
            journal_path: PathBuf::from("wellhead.jsonl"),
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl WellheadConfig {
    /// The daemon's bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Loads a configuration file.
///
/// `.json` files are read as JSON and anything else as YAML.  A missing file
/// yields the defaults.
///
/// # Returns
/// * `Ok(WellheadConfig)` - The configuration
/// * `Err(String)` - If the file cannot be read or parsed
pub fn load_config(path: &Path) -> Result<WellheadConfig, String> {
    if !path.exists() {
        return Ok(WellheadConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
    if content.trim().is_empty() {
        return Ok(WellheadConfig::default());
    }
    if is_json(path) {
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))
    } else {
        serde_yml::from_str(&content)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))
    }
}

/// Writes a configuration file in the format its extension names.
pub fn save_config(path: &Path, config: &WellheadConfig) -> Result<(), String> {
    let content = if is_json(path) {
        serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?
    } else {
        serde_yml::to_string(config).map_err(|e| format!("Failed to serialize config: {}", e))?
    };
    std::fs::write(path, content)
        .map_err(|e| format!("Failed to write config {}: {}", path.display(), e))
}
