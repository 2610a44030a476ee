//! Realtime Database REST client.

use async_trait::async_trait;
use freqsync_core::{CoreError, RemoteStore};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::credentials::FirebaseConfig;
use crate::error::{FirebaseError, Result};

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

/// Client for one Realtime Database instance.
///
/// Cheap to clone is not needed; share it behind an `Arc` and it can be
/// used concurrently from any number of tasks.
///
/// # Example
///
/// ```ignore
/// use freqsync_firebase::{FirebaseClient, FirebaseConfig};
///
/// let config = FirebaseConfig::with_secret("https://example.firebaseio.com", "secret");
/// let client = FirebaseClient::new(config)?;
///
/// client.probe().await?;
/// let key = client.push_value("frequency/main", &serde_json::json!({"name": "044.800"})).await?;
/// ```
pub struct FirebaseClient {
    http: Client,
    base_url: String,
    secret: Option<String>,
}

impl FirebaseClient {
    /// Create a new client for the given database.
    pub fn new(config: FirebaseConfig) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(FirebaseError::InvalidUrl("URL cannot be empty".into()));
        }

        let base_url = config.database_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(FirebaseError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("freqsync/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            secret: config.secret,
        })
    }

    /// The database base URL.
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Verify the database is reachable and the credentials are accepted.
    ///
    /// Performs a shallow read of the root, which succeeds on an empty
    /// database and never transfers child data.
    pub async fn probe(&self) -> Result<()> {
        let url = self.node_url("");
        debug!(url = %url, "Probing database");

        let response = self
            .http
            .get(&url)
            .query(&self.query_params(&[("shallow", "true")]))
            .send()
            .await
            .map_err(classify_send_error)?;

        check_status(response).await.map(|_| ())
    }

    /// Create a child of `parent` under a server-generated key.
    pub async fn push_value(&self, parent: &str, value: &Value) -> Result<String> {
        let url = self.node_url(parent);
        debug!(url = %url, "Pushing value");

        let response = self
            .http
            .post(&url)
            .query(&self.query_params(&[]))
            .json(value)
            .send()
            .await
            .map_err(classify_send_error)?;

        let response = check_status(response).await?;
        let push: PushResponse = response
            .json()
            .await
            .map_err(|e| FirebaseError::ParseError(format!("bad push response: {e}")))?;

        Ok(push.name)
    }

    /// Replace the value at `path`.
    pub async fn set_value(&self, path: &str, value: &Value) -> Result<()> {
        let url = self.node_url(path);
        debug!(url = %url, "Setting value");

        let response = self
            .http
            .put(&url)
            .query(&self.query_params(&[]))
            .json(value)
            .send()
            .await
            .map_err(classify_send_error)?;

        check_status(response).await.map(|_| ())
    }

    /// Merge `fields` into the value at `path`.
    pub async fn update_value(&self, path: &str, fields: &Value) -> Result<()> {
        let url = self.node_url(path);
        debug!(url = %url, "Updating fields");

        let response = self
            .http
            .patch(&url)
            .query(&self.query_params(&[]))
            .json(fields)
            .send()
            .await
            .map_err(classify_send_error)?;

        check_status(response).await.map(|_| ())
    }

    /// Delete the node at `path` and everything under it.
    pub async fn delete_value(&self, path: &str) -> Result<()> {
        let url = self.node_url(path);
        debug!(url = %url, "Deleting node");

        let response = self
            .http
            .delete(&url)
            .query(&self.query_params(&[]))
            .send()
            .await
            .map_err(classify_send_error)?;

        check_status(response).await.map(|_| ())
    }

    /// Read the value at `path`, `None` when the node is absent.
    pub async fn get_value(&self, path: &str) -> Result<Option<Value>> {
        let url = self.node_url(path);
        debug!(url = %url, "Reading node");

        let response = self
            .http
            .get(&url)
            .query(&self.query_params(&[]))
            .send()
            .await
            .map_err(classify_send_error)?;

        let response = check_status(response).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| FirebaseError::ParseError(format!("bad read response: {e}")))?;

        // The REST surface answers `null` for missing nodes
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    fn node_url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/.json", self.base_url)
        } else {
            format!("{}/{}.json", self.base_url, path)
        }
    }

    fn query_params<'a>(&'a self, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut params: Vec<(&str, &str)> = extra.to_vec();
        if let Some(secret) = &self.secret {
            params.push(("auth", secret.as_str()));
        }
        params
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        Ok(response)
    } else if status.as_u16() == 401 || status.as_u16() == 403 {
        let message = response.text().await.unwrap_or_default();
        Err(FirebaseError::AuthFailed(message))
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(FirebaseError::ServerError {
            status: status.as_u16(),
            message,
        })
    }
}

fn classify_send_error(err: reqwest::Error) -> FirebaseError {
    if err.is_connect() || err.is_timeout() {
        FirebaseError::Unreachable(err.to_string())
    } else {
        FirebaseError::Request(err)
    }
}

#[async_trait]
impl RemoteStore for FirebaseClient {
    async fn push(&self, parent: &str, value: &Value) -> freqsync_core::Result<String> {
        self.push_value(parent, value).await.map_err(CoreError::from)
    }

    async fn set(&self, path: &str, value: &Value) -> freqsync_core::Result<()> {
        self.set_value(path, value).await.map_err(CoreError::from)
    }

    async fn update(&self, path: &str, fields: &Value) -> freqsync_core::Result<()> {
        self.update_value(path, fields).await.map_err(CoreError::from)
    }

    async fn delete(&self, path: &str) -> freqsync_core::Result<()> {
        self.delete_value(path).await.map_err(CoreError::from)
    }

    async fn get(&self, path: &str) -> freqsync_core::Result<Option<Value>> {
        self.get_value(path).await.map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert!(FirebaseClient::new(FirebaseConfig::new("https://example.firebaseio.com")).is_ok());
        assert!(FirebaseClient::new(FirebaseConfig::new("http://localhost:9000")).is_ok());

        assert!(FirebaseClient::new(FirebaseConfig::new("")).is_err());
        assert!(FirebaseClient::new(FirebaseConfig::new("not-a-url")).is_err());
        assert!(FirebaseClient::new(FirebaseConfig::new("ftp://example.com")).is_err());
    }

    #[test]
    fn test_node_url_shaping() {
        let client =
            FirebaseClient::new(FirebaseConfig::new("https://example.firebaseio.com/")).unwrap();

        assert_eq!(client.node_url(""), "https://example.firebaseio.com/.json");
        assert_eq!(
            client.node_url("frequency/main"),
            "https://example.firebaseio.com/frequency/main.json"
        );
        assert_eq!(
            client.node_url("/frequency/main/"),
            "https://example.firebaseio.com/frequency/main.json"
        );
    }
}
