//! Error types for the watch engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running watch sessions
#[derive(Error, Debug)]
pub enum WatchError {
    /// Watched path is missing or not a directory
    #[error("Invalid watch directory: {}", .0.display())]
    InvalidDirectory(PathBuf),

    /// Polling interval is out of range
    #[error("Invalid polling interval: {0}")]
    InvalidInterval(String),

    /// A session with this name is already running
    #[error("Session already running: {0}")]
    DuplicateSession(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote store error
    #[error(transparent)]
    Remote(#[from] freqsync_core::CoreError),
}

pub type Result<T> = std::result::Result<T, WatchError>;
