//! Error types for the Firebase client.

use thiserror::Error;

/// Errors that can occur when talking to the Realtime Database.
#[derive(Error, Debug)]
pub enum FirebaseError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Database returned an error response
    #[error("Database error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Invalid database URL
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse a database response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Database is offline or unreachable
    #[error("Database unreachable: {0}")]
    Unreachable(String),

    /// Key file missing or malformed
    #[error("Key file error: {0}")]
    KeyFile(String),
}

/// Result type for Firebase client operations.
pub type Result<T> = std::result::Result<T, FirebaseError>;

impl From<FirebaseError> for freqsync_core::CoreError {
    fn from(err: FirebaseError) -> Self {
        match err {
            FirebaseError::AuthFailed(msg) => freqsync_core::CoreError::RemoteAuth(msg),
            other => freqsync_core::CoreError::Remote(other.to_string()),
        }
    }
}
