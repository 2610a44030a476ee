//! Session registry
//!
//! Name → running-session map. This map is the only mutable state shared
//! between sessions; everything else is owned by the individual workers.

use freqsync_core::RemoteStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{Result, WatchError};
use crate::session::{self, SessionHandle};
use crate::types::{SessionConfig, SessionStatus};

/// Registry of named monitoring sessions.
///
/// Each session owns a disjoint remote namespace `<root>/<name>`; the
/// registry enforces one active session per name.
pub struct SessionRegistry {
    store: Arc<dyn RemoteStore>,
    /// Remote subtree all session namespaces live under
    root: String,
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    /// Create a registry rooted at `root` in the remote store.
    pub fn new(store: Arc<dyn RemoteStore>, root: impl Into<String>) -> Self {
        Self {
            store,
            root: root.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Remote namespace of a session name.
    pub fn namespace(&self, name: &str) -> String {
        format!("{}/{}", self.root, name)
    }

    /// Validate and start a new session.
    ///
    /// Rejects a name that is already running; a session that has already
    /// wound down (stopped or died on a fatal error) may be re-created.
    pub async fn create(&self, config: SessionConfig) -> Result<()> {
        let mut sessions = self.sessions.lock().await;

        if let Some(handle) = sessions.get(&config.name) {
            if !handle.is_finished() {
                return Err(WatchError::DuplicateSession(config.name));
            }
        }

        let namespace = self.namespace(&config.name);
        let name = config.name.clone();
        let handle = session::spawn(config, Arc::clone(&self.store), namespace)?;
        // replaces a handle whose worker already wound down, if any
        sessions.insert(name, handle);

        Ok(())
    }

    /// Stop a session. No-op when the name is not running.
    ///
    /// Returns whether a running session was found and stopped within the
    /// grace period.
    pub async fn stop(&self, name: &str) -> bool {
        let handle = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(name)
        };

        match handle {
            Some(handle) => handle.stop().await,
            None => false,
        }
    }

    /// Stop a session (if running) and delete its whole remote namespace.
    pub async fn remove(&self, name: &str) -> Result<()> {
        self.stop(name).await;

        self.store.delete(&self.namespace(name)).await?;
        info!(session = %name, "Session removed, remote namespace deleted");
        Ok(())
    }

    /// Whether a session with this name is currently running.
    pub async fn is_running(&self, name: &str) -> bool {
        let sessions = self.sessions.lock().await;
        sessions.get(name).is_some_and(|handle| !handle.is_finished())
    }

    /// Status snapshots of every registered session.
    pub async fn statuses(&self) -> Vec<SessionStatus> {
        let sessions = self.sessions.lock().await;
        let mut statuses: Vec<SessionStatus> =
            sessions.values().map(|handle| handle.status()).collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Stop every running session, used at shutdown.
    ///
    /// Remote namespaces are left intact; only [`remove`](Self::remove)
    /// deletes data.
    pub async fn stop_all(&self) {
        let handles: Vec<SessionHandle> = {
            let mut sessions = self.sessions.lock().await;
            sessions.drain().map(|(_, handle)| handle).collect()
        };

        for handle in handles {
            handle.stop().await;
        }
    }
}
