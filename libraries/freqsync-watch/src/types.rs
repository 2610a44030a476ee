use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How a session interprets the watched directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Top-level subdirectories whose whole name is a frequency label
    Folders,
    /// Files anywhere under the directory with a frequency somewhere in
    /// the name
    Files,
}

/// Configuration of one monitoring session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session name; doubles as the remote namespace segment
    pub name: String,
    /// Directory to watch
    pub directory: PathBuf,
    /// Polling cadence, one second or more
    pub interval: Duration,
    pub mode: WatchMode,
    /// When set, entries present at session start are never mirrored
    pub ignore_preexisting: bool,
}

impl SessionConfig {
    /// New folder-watching session tracking all entries.
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            interval,
            mode: WatchMode::Folders,
            ignore_preexisting: false,
        }
    }

    /// Set the watch mode.
    pub fn with_mode(mut self, mode: WatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Ignore entries that already exist when the session starts.
    pub fn with_ignore_preexisting(mut self, ignore: bool) -> Self {
        self.ignore_preexisting = ignore;
        self
    }
}

/// Point-in-time view of one session, published after every pass.
///
/// Taken outside the polling loop via a watch channel; never blocks the
/// session worker.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub name: String,
    pub running: bool,
    /// Entries currently mirrored to the remote store
    pub tracked_entries: usize,
    /// Reconciliation passes completed since start
    pub passes: u64,
    /// Last tick-level error, cleared by the next clean pass
    pub last_error: Option<String>,
}

impl SessionStatus {
    pub(crate) fn idle(name: &str) -> Self {
        Self {
            name: name.to_string(),
            running: false,
            tracked_entries: 0,
            passes: 0,
            last_error: None,
        }
    }
}
