use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::{LayerKind, Tool};

/// One recorded engine event.
///
/// The journal is the engine's diagnostic trail: every state transition, every
/// deferred or cancelled event and every solver round trip lands here with a
/// timestamp, so a session can be audited after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier for this entry
    pub id: String,

    /// When the event happened
    pub timestamp: DateTime<Utc>,

    /// What happened
    pub event: JournalEvent,

    /// How it ended
    pub status: EventStatus,
}

/// Everything the engine records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalEvent {
    // Tool operations
    ToolSelected {
        layer: LayerKind,
        tool: Tool,
    },

    // Feature operations
    FeatureAdded {
        layer: LayerKind,
        id: u32,
        label: String,
    },
    AddDeferred {
        layer: LayerKind,
        reason: String,
    },
    FeatureDeleted {
        layer: LayerKind,
        id: u32,
        label: String,
        renumbered: usize,
    },
    DeleteCancelled {
        layer: LayerKind,
        remaining: usize,
    },
    DeleteUnresolved {
        layer: LayerKind,
        inferred_id: u32,
    },
    EditsCommitted {
        layer: LayerKind,
        rows: usize,
    },

    // Persistence
    SnapshotWritten {
        layer: LayerKind,
        records: usize,
    },
    SnapshotRestored {
        layer: LayerKind,
        records: usize,
    },
    SnapshotRejected {
        layer: LayerKind,
        error: String,
    },
    StyleChanged {
        layer: LayerKind,
        color: String,
    },

    // Solver round trips
    ValidationFailed {
        message: String,
    },
    SolveStarted {
        features: usize,
    },
    SolveCompleted {
        levels: usize,
        contours: usize,
    },
    SolveFailed {
        error: String,
    },
    SolveAbandoned,
    LevelsNotStored {
        error: String,
    },
    InputBlocked {
        operation: String,
    },
}

/// How a journaled event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Success,
    Deferred,
    Cancelled,
    Failed,
}

impl JournalEntry {
    /// Creates a new entry stamped with the current time.
    pub fn new(event: JournalEvent, status: EventStatus) -> Self {
        let timestamp = Utc::now();
        Self {
            id: format!(
                "journal_{}",
                timestamp.timestamp_nanos_opt().unwrap_or_default()
            ),
            timestamp,
            event,
            status,
        }
    }

    /// True for events that completed normally.
    pub fn is_success(&self) -> bool {
        self.status == EventStatus::Success
    }

    /// Short operation name for diagnostics.
    pub fn operation_type(&self) -> &'static str {
        match &self.event {
            JournalEvent::ToolSelected { .. } => "ToolSelected",
            JournalEvent::FeatureAdded { .. } => "FeatureAdded",
            JournalEvent::AddDeferred { .. } => "AddDeferred",
            JournalEvent::FeatureDeleted { .. } => "FeatureDeleted",
            JournalEvent::DeleteCancelled { .. } => "DeleteCancelled",
            JournalEvent::DeleteUnresolved { .. } => "DeleteUnresolved",
            JournalEvent::EditsCommitted { .. } => "EditsCommitted",
            JournalEvent::SnapshotWritten { .. } => "SnapshotWritten",
            JournalEvent::SnapshotRestored { .. } => "SnapshotRestored",
            JournalEvent::SnapshotRejected { .. } => "SnapshotRejected",
            JournalEvent::StyleChanged { .. } => "StyleChanged",
            JournalEvent::ValidationFailed { .. } => "ValidationFailed",
            JournalEvent::SolveStarted { .. } => "SolveStarted",
            JournalEvent::SolveCompleted { .. } => "SolveCompleted",
            JournalEvent::SolveFailed { .. } => "SolveFailed",
            JournalEvent::SolveAbandoned => "SolveAbandoned",
            JournalEvent::LevelsNotStored { .. } => "LevelsNotStored",
            JournalEvent::InputBlocked { .. } => "InputBlocked",
        }
    }
}

/// Event journal, kept in memory and optionally appended to a JSONL file.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    log_file_path: Option<PathBuf>,
    entries: Vec<JournalEntry>,
    echo: bool,
}

impl Journal {
    /// A journal that only keeps entries in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A journal that also appends every entry to `log_file_path`.
    pub fn durable(log_file_path: PathBuf) -> Self {
        Self {
            log_file_path: Some(log_file_path),
            ..Self::default()
        }
    }

    /// Also print every entry to stderr.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Records an event.  File errors are reported on stderr and otherwise ignored.
    pub fn record(&mut self, event: JournalEvent, status: EventStatus) {
        let entry = JournalEntry::new(event, status);
        if self.echo {
            eprintln!(
                "[{}] {} {:?}: {:?}",
                entry.timestamp.format("%H:%M:%S%.3f"),
                entry.operation_type(),
                entry.status,
                entry.event
            );
        }
        self.log_or_error(&entry);
        self.entries.push(entry);
    }

    /// Entries recorded by this process, oldest first.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&JournalEntry> {
        self.entries.last()
    }

    /// Writes an entry to the JSONL file, if there is one.
    pub fn log(&self, entry: &JournalEntry) -> Result<(), std::io::Error> {
        let Some(path) = &self.log_file_path else {
            return Ok(());
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        let json_line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        writeln!(file, "{}", json_line)?;
        file.flush()?;
        Ok(())
    }

    /// Logs an entry and prints an error message if logging fails
    pub fn log_or_error(&self, entry: &JournalEntry) {
        if let Err(e) = self.log(entry) {
            eprintln!("Failed to write journal entry: {}", e);
        }
    }

    /// Reads every entry from the JSONL file, skipping lines that do not parse.
    pub fn read_log_entries(&self) -> Result<Vec<JournalEntry>, std::io::Error> {
        let Some(path) = &self.log_file_path else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                match serde_json::from_str::<JournalEntry>(&line) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        eprintln!("Failed to parse journal entry: {} - Line: {}", e, line);
                    }
                }
            }
        }

        Ok(entries)
    }
}
