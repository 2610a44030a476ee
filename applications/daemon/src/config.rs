/// Daemon configuration
///
/// Persisted as a JSON file (`config.json` next to the binary by default)
/// and overridable through `FREQSYNC__`-prefixed environment variables:
///
/// ```json
/// {
///     "firebase_url": "https://example.firebaseio.com",
///     "firebase_key_path": "/etc/freqsync/key.json",
///     "windows": {
///         "main": {
///             "directory_path": "/srv/watch",
///             "update_interval": "5"
///         }
///     }
/// }
/// ```
use crate::error::{DaemonError, Result};
use freqsync_watch::{SessionConfig, WatchMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Realtime Database base URL
    pub firebase_url: String,

    /// Key file holding the database secret; omit for open-rules databases
    #[serde(default)]
    pub firebase_key_path: Option<PathBuf>,

    /// Remote subtree all session namespaces live under
    #[serde(default = "default_root_path")]
    pub root_path: String,

    /// One monitoring window per unique name
    #[serde(default)]
    pub windows: HashMap<String, WindowConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowConfig {
    /// Directory to watch
    pub directory_path: PathBuf,

    /// Polling interval in whole seconds, as a string
    pub update_interval: String,

    #[serde(default = "default_mode")]
    pub mode: WatchMode,

    /// Never mirror entries that already exist when the window starts
    #[serde(default)]
    pub ignore_preexisting: bool,
}

impl AppConfig {
    /// Load configuration from file and environment.
    ///
    /// Falls back to `config.json` in the working directory when no path
    /// is given; a missing default file just yields the env-only view.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("config.json");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with FREQSYNC__)
        settings = settings.add_source(
            config::Environment::with_prefix("FREQSYNC")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| DaemonError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| DaemonError::Config(e.to_string()))
    }

    /// Validate everything a session start would reject, before starting
    /// anything.
    pub fn validate(&self) -> Result<()> {
        if self.firebase_url.is_empty() {
            return Err(DaemonError::Config("firebase_url is required".to_string()));
        }
        if !self.firebase_url.starts_with("http://") && !self.firebase_url.starts_with("https://")
        {
            return Err(DaemonError::Config(format!(
                "firebase_url must be an http(s) URL, got {:?}",
                self.firebase_url
            )));
        }

        if let Some(key_path) = &self.firebase_key_path {
            if !key_path.is_file() {
                return Err(DaemonError::Config(format!(
                    "firebase_key_path {} does not exist",
                    key_path.display()
                )));
            }
        }

        for (name, window) in &self.windows {
            if !window.directory_path.is_dir() {
                return Err(DaemonError::Config(format!(
                    "window {name:?}: {} is not a directory",
                    window.directory_path.display()
                )));
            }
            parse_interval(&window.update_interval)
                .map_err(|e| DaemonError::Config(format!("window {name:?}: {e}")))?;
        }

        Ok(())
    }

    /// Translate the windows into session configurations, sorted by name
    /// for deterministic startup order.
    pub fn session_configs(&self) -> Result<Vec<SessionConfig>> {
        let mut configs = Vec::with_capacity(self.windows.len());

        for (name, window) in &self.windows {
            let interval = parse_interval(&window.update_interval)
                .map_err(|e| DaemonError::Config(format!("window {name:?}: {e}")))?;

            configs.push(
                SessionConfig::new(name.clone(), window.directory_path.clone(), interval)
                    .with_mode(window.mode)
                    .with_ignore_preexisting(window.ignore_preexisting),
            );
        }

        configs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(configs)
    }
}

/// Parse an `update_interval` string: whole seconds, one or more.
pub fn parse_interval(raw: &str) -> std::result::Result<Duration, String> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("update_interval {raw:?} is not a whole number of seconds"))?;

    if secs == 0 {
        return Err("update_interval must be at least 1 second".to_string());
    }

    Ok(Duration::from_secs(secs))
}

fn default_root_path() -> String {
    "frequency".to_string()
}

fn default_mode() -> WatchMode {
    WatchMode::Folders
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("5").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_interval(" 60 ").unwrap(), Duration::from_secs(60));

        assert!(parse_interval("0").is_err());
        assert!(parse_interval("five").is_err());
        assert!(parse_interval("1.5").is_err());
        assert!(parse_interval("").is_err());
        assert!(parse_interval("-3").is_err());
    }

    #[test]
    fn test_load_parses_the_persisted_shape() {
        let temp = TempDir::new().unwrap();
        let watch_dir = temp.path().join("watch");
        fs::create_dir(&watch_dir).unwrap();

        let path = write_config(
            temp.path(),
            &format!(
                r#"{{
                    "firebase_url": "https://example.firebaseio.com",
                    "windows": {{
                        "main": {{
                            "directory_path": "{}",
                            "update_interval": "5"
                        }}
                    }}
                }}"#,
                watch_dir.display()
            ),
        );

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.firebase_url, "https://example.firebaseio.com");
        assert_eq!(config.root_path, "frequency");
        assert!(config.firebase_key_path.is_none());

        let window = &config.windows["main"];
        assert_eq!(window.update_interval, "5");
        assert_eq!(window.mode, WatchMode::Folders);
        assert!(!window.ignore_preexisting);

        config.validate().unwrap();

        let sessions = config.session_configs().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "main");
        assert_eq!(sessions[0].interval, Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_missing_directory() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"{
                "firebase_url": "https://example.firebaseio.com",
                "windows": {
                    "main": {
                        "directory_path": "/nonexistent/watch",
                        "update_interval": "5"
                    }
                }
            }"#,
        );

        let config = AppConfig::load(Some(&path)).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_validate_rejects_bad_interval() {
        let temp = TempDir::new().unwrap();
        let watch_dir = temp.path().join("watch");
        fs::create_dir(&watch_dir).unwrap();

        let path = write_config(
            temp.path(),
            &format!(
                r#"{{
                    "firebase_url": "https://example.firebaseio.com",
                    "windows": {{
                        "main": {{
                            "directory_path": "{}",
                            "update_interval": "0"
                        }}
                    }}
                }}"#,
                watch_dir.display()
            ),
        );

        let config = AppConfig::load(Some(&path)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"{"firebase_url": "example.firebaseio.com"}"#,
        );

        let config = AppConfig::load(Some(&path)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_configs_are_sorted_by_name() {
        let temp = TempDir::new().unwrap();
        let watch_dir = temp.path().join("watch");
        fs::create_dir(&watch_dir).unwrap();

        let path = write_config(
            temp.path(),
            &format!(
                r#"{{
                    "firebase_url": "https://example.firebaseio.com",
                    "windows": {{
                        "zulu": {{"directory_path": "{dir}", "update_interval": "5"}},
                        "alpha": {{"directory_path": "{dir}", "update_interval": "10"}}
                    }}
                }}"#,
                dir = watch_dir.display()
            ),
        );

        let config = AppConfig::load(Some(&path)).unwrap();
        let names: Vec<_> = config
            .session_configs()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zulu"]);
    }
}
