//! Session runner
//!
//! One background task per session: snapshot, reconcile, sleep, repeat.
//! The task owns the tracked-entry table outright; the rest of the process
//! talks to it only through the stop signal and the status channel.

use freqsync_core::RemoteStore;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result, WatchError};
use crate::reconcile;
use crate::snapshot::{self, Snapshot};
use crate::tracked::{TrackedEntry, TrackedTable};
use crate::types::{SessionConfig, SessionStatus};

/// Sleep after a failed tick before trying again
const ERROR_COOLDOWN: Duration = Duration::from_secs(10);

/// How long `stop` waits for the loop to wind down
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Handle to one running session.
///
/// Dropping the handle without calling [`stop`](Self::stop) makes the
/// worker wind down on its own at the next loop iteration; the registry
/// always stops sessions explicitly instead.
pub struct SessionHandle {
    name: String,
    stop_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<SessionStatus>,
    join: JoinHandle<()>,
}

impl SessionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latest status published by the worker.
    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    /// Whether the worker has exited (stopped or died on a fatal error).
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal the loop to stop and wait for it, within a bounded grace
    /// period.
    ///
    /// Returns `false` when the worker did not exit in time (for example,
    /// mid remote call); the worker will still observe the signal and
    /// exit on its own afterwards.
    pub async fn stop(self) -> bool {
        let _ = self.stop_tx.send(true);

        match tokio::time::timeout(STOP_GRACE, self.join).await {
            Ok(_) => {
                info!(session = %self.name, "Session stopped");
                true
            }
            Err(_) => {
                warn!(
                    session = %self.name,
                    "Session did not stop within {}s, detaching",
                    STOP_GRACE.as_secs()
                );
                false
            }
        }
    }
}

/// Validate the configuration and start the session worker.
///
/// `namespace` is the remote subtree all of this session's records live
/// under. Rejects a missing or non-directory watch path and a sub-second
/// interval before anything is spawned.
pub fn spawn(
    config: SessionConfig,
    store: Arc<dyn RemoteStore>,
    namespace: String,
) -> Result<SessionHandle> {
    if !config.directory.is_dir() {
        return Err(WatchError::InvalidDirectory(config.directory.clone()));
    }
    if config.interval < Duration::from_secs(1) {
        return Err(WatchError::InvalidInterval(format!(
            "{:?} is below the 1s minimum",
            config.interval
        )));
    }

    let name = config.name.clone();
    let (stop_tx, stop_rx) = watch::channel(false);
    let (status_tx, status_rx) = watch::channel(SessionStatus::idle(&name));

    let join = tokio::spawn(run_loop(config, store, namespace, stop_rx, status_tx));

    Ok(SessionHandle {
        name,
        stop_tx,
        status_rx,
        join,
    })
}

async fn run_loop(
    config: SessionConfig,
    store: Arc<dyn RemoteStore>,
    namespace: String,
    mut stop_rx: watch::Receiver<bool>,
    status_tx: watch::Sender<SessionStatus>,
) {
    info!(
        session = %config.name,
        directory = %config.directory.display(),
        interval_secs = config.interval.as_secs(),
        "Session started"
    );

    let mut table = TrackedTable::new();
    let mut exclude: HashSet<PathBuf> = HashSet::new();
    let mut preexisting_captured = !config.ignore_preexisting;
    let mut adopted = false;
    let mut passes: u64 = 0;

    loop {
        if *stop_rx.borrow() {
            break;
        }

        let tick = run_tick(
            &config,
            store.as_ref(),
            &namespace,
            &mut table,
            &mut exclude,
            &mut preexisting_captured,
            &mut adopted,
        )
        .await;

        let (sleep_for, last_error) = match tick {
            Ok(outcome) => {
                passes += 1;
                if outcome.mutations() > 0 || outcome.failed > 0 {
                    info!(
                        session = %config.name,
                        created = outcome.created,
                        removed = outcome.removed,
                        renamed = outcome.renamed,
                        updated = outcome.updated,
                        failed = outcome.failed,
                        "Reconciliation pass complete"
                    );
                }
                (config.interval, None)
            }
            Err(WatchError::InvalidDirectory(dir)) => {
                // The watched root itself is gone; nothing to poll anymore
                error!(
                    session = %config.name,
                    directory = %dir.display(),
                    "Watch directory no longer valid, session terminating"
                );
                break;
            }
            Err(e) => {
                warn!(session = %config.name, error = %e, "Tick failed, cooling down");
                (ERROR_COOLDOWN, Some(e.to_string()))
            }
        };

        let _ = status_tx.send(SessionStatus {
            name: config.name.clone(),
            running: true,
            tracked_entries: table.len(),
            passes,
            last_error,
        });

        // Interval is a lower bound: a long tick just runs back-to-back
        // with the next one, never concurrently.
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    // Handle dropped; nothing can stop this session anymore
                    break;
                }
            }
            () = tokio::time::sleep(sleep_for) => {}
        }
    }

    let _ = status_tx.send(SessionStatus {
        name: config.name.clone(),
        running: false,
        tracked_entries: table.len(),
        passes,
        last_error: None,
    });
    debug!(session = %config.name, "Session loop exited");
}

#[allow(clippy::too_many_arguments)]
async fn run_tick(
    config: &SessionConfig,
    store: &dyn RemoteStore,
    namespace: &str,
    table: &mut TrackedTable,
    exclude: &mut HashSet<PathBuf>,
    preexisting_captured: &mut bool,
    adopted: &mut bool,
) -> Result<reconcile::PassOutcome> {
    if !*preexisting_captured {
        let initial = snapshot::capture(&config.directory, config.mode, &HashSet::new())?;
        *exclude = initial.into_keys().collect();
        *preexisting_captured = true;
        info!(
            session = %config.name,
            ignored = exclude.len(),
            "Ignoring entries present at session start"
        );
    }

    if !*adopted {
        let count = adopt_existing(store, namespace, config, exclude, table).await?;
        *adopted = true;
        if count > 0 {
            info!(session = %config.name, adopted = count, "Adopted existing remote records");
        }
    }

    let snap: Snapshot = snapshot::capture(&config.directory, config.mode, exclude)?;
    Ok(reconcile::run_pass(store, namespace, config.mode, table, &snap).await)
}

/// Seed the tracked table from records already in the session's namespace.
///
/// Records whose name still resolves to a live matching entry keep their
/// server key, so a restart never pushes duplicates. Records that no
/// longer resolve locally are stale and deleted outright.
async fn adopt_existing(
    store: &dyn RemoteStore,
    namespace: &str,
    config: &SessionConfig,
    exclude: &HashSet<PathBuf>,
    table: &mut TrackedTable,
) -> Result<usize> {
    let Some(value) = store.get(namespace).await? else {
        return Ok(0);
    };
    let Some(records) = value.as_object() else {
        warn!(session = %config.name, "Remote namespace is not a record map, ignoring");
        return Ok(0);
    };

    let mut count = 0;
    for (key, record) in records {
        // Prefer the recorded absolute path (resolves entries nested below
        // the root); fall back to name for records from older writers.
        let local = record
            .get("path")
            .and_then(|path| path.as_str())
            .map(PathBuf::from)
            .filter(|path| path.starts_with(&config.directory))
            .or_else(|| {
                record
                    .get("name")
                    .and_then(|name| name.as_str())
                    .map(|name| config.directory.join(name))
            })
            .filter(|path| !exclude.contains(path) && !table.contains(path));

        let meta = local
            .as_deref()
            .and_then(|path| snapshot::stat_entry(path, config.mode));

        match (local, meta) {
            (Some(path), Some(meta)) => {
                debug!(
                    session = %config.name,
                    path = %path.display(),
                    key = %key,
                    "Adopting remote record"
                );
                table.insert(
                    path,
                    TrackedEntry {
                        key: key.clone(),
                        frequency: meta.frequency,
                        modified: meta.modified,
                        identity: meta.identity,
                    },
                );
                count += 1;
            }
            _ => {
                debug!(session = %config.name, key = %key, "Deleting stale remote record");
                if let Err(e) = store.delete(&format!("{namespace}/{key}")).await {
                    warn!(
                        session = %config.name,
                        key = %key,
                        error = %e,
                        "Stale record delete failed"
                    );
                }
            }
        }
    }

    Ok(count)
}
