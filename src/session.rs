//! Session Cache: a string key-value store that outlives a page reload.
//!
//! Keys used by wellhead:
//! - `<Layer>_Features`: JSON array of export records for the layer
//! - `<Layer>_Style`: JSON string with the layer's stroke color
//! - `levels`: the contour levels of the last successful solve

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Session key of the last solve's contour levels.
pub const LEVELS_KEY: &str = "levels";

/// Errors from persistent session stores.
#[derive(Debug)]
pub enum SessionError {
    /// The backing file could not be read or written.
    Io(std::io::Error),
    /// The backing file is not a JSON object of strings.
    Corrupt(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Io(e) => write!(f, "session store I/O error: {}", e),
            SessionError::Corrupt(msg) => write!(f, "session store is corrupt: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Io(e)
    }
}

/// Narrow interface to the session store.
pub trait SessionCache: Send {
    /// Reads a key.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a key, replacing any previous value.
    fn set(&mut self, key: &str, value: String) -> Result<(), SessionError>;

    /// Deletes a key.  Returns whether it existed.
    fn remove(&mut self, key: &str) -> Result<bool, SessionError>;

    /// Deletes every key.
    fn clear(&mut self) -> Result<(), SessionError>;

    /// Every key currently stored.
    fn keys(&self) -> Vec<String>;
}

/// Session store that lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionCache {
    entries: BTreeMap<String, String>,
}

impl InMemorySessionCache {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCache for InMemorySessionCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), SessionError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, SessionError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn clear(&mut self) -> Result<(), SessionError> {
        self.entries.clear();
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Session store persisted as a single JSON object file.
///
/// Every write rewrites the file through a temporary sibling and a rename, so a
/// reader never sees a half-written session.
#[derive(Debug, Clone)]
pub struct FileSessionCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileSessionCache {
    /// Opens the session file at `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)
                    .map_err(|e| SessionError::Corrupt(format!("{}: {}", path.display(), e)))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), SessionError> {
        let contents = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionCache for FileSessionCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), SessionError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<bool, SessionError> {
        let existed = self.entries.remove(key).is_some();
        if existed {
            self.flush()?;
        }
        Ok(existed)
    }

    fn clear(&mut self) -> Result<(), SessionError> {
        self.entries.clear();
        self.flush()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
