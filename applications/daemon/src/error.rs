/// Daemon error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    /// Bad or missing configuration; nothing was started
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote store could not be initialized; nothing was started
    #[error("Initialization error: {0}")]
    Init(String),

    /// Session-level error bubbled up from the watch engine
    #[error(transparent)]
    Watch(#[from] freqsync_watch::WatchError),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
