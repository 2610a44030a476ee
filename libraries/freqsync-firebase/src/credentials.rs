//! Database connection configuration and key-file loading.

use serde::Deserialize;
use std::path::Path;

use crate::error::{FirebaseError, Result};

/// Connection settings for one Realtime Database instance.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Database base URL, e.g. `https://example.firebaseio.com`
    pub database_url: String,
    /// Database secret sent as the `auth` query parameter, if any
    pub secret: Option<String>,
}

impl FirebaseConfig {
    /// Create a configuration without credentials (open rules databases).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            secret: None,
        }
    }

    /// Create a configuration with a database secret.
    pub fn with_secret(database_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            secret: Some(secret.into()),
        }
    }
}

#[derive(Deserialize)]
struct KeyFile {
    #[serde(alias = "token")]
    database_secret: String,
}

/// Load a database secret from a key file.
///
/// Accepts either a JSON file carrying a `database_secret` (or `token`)
/// field, or a plain file whose entire content is the secret.
pub fn load_secret(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        FirebaseError::KeyFile(format!("cannot read {}: {e}", path.display()))
    })?;

    if let Ok(key) = serde_json::from_str::<KeyFile>(&raw) {
        return Ok(key.database_secret);
    }

    let secret = raw.trim();
    if secret.is_empty() || secret.contains(char::is_whitespace) {
        return Err(FirebaseError::KeyFile(format!(
            "{} is neither a key JSON nor a bare secret",
            path.display()
        )));
    }

    Ok(secret.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_key_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_secret_from_json() {
        let file = write_key_file(r#"{"database_secret": "s3cr3t"}"#);
        assert_eq!(load_secret(file.path()).unwrap(), "s3cr3t");
    }

    #[test]
    fn test_load_secret_from_json_token_alias() {
        let file = write_key_file(r#"{"token": "legacy"}"#);
        assert_eq!(load_secret(file.path()).unwrap(), "legacy");
    }

    #[test]
    fn test_load_secret_from_bare_file() {
        let file = write_key_file("bare-secret-value\n");
        assert_eq!(load_secret(file.path()).unwrap(), "bare-secret-value");
    }

    #[test]
    fn test_load_secret_rejects_garbage() {
        let file = write_key_file("several words of prose");
        assert!(matches!(
            load_secret(file.path()),
            Err(FirebaseError::KeyFile(_))
        ));
    }

    #[test]
    fn test_load_secret_missing_file() {
        let result = load_secret(Path::new("/nonexistent/key.json"));
        assert!(matches!(result, Err(FirebaseError::KeyFile(_))));
    }
}
