//! Reconciliation engine
//!
//! One pass diffs the tracked-entry table against a fresh snapshot and
//! issues the remote mutations that bring the store back in line:
//! renames first (so a moved entry is never mistaken for a removal plus an
//! addition), then removals, additions, and modification touches.
//!
//! Every mutation is isolated: a failed remote call is logged, leaves the
//! table untouched for that entry, and the entry re-classifies the same
//! way on the next pass, so failures heal themselves without bookkeeping.

use freqsync_core::{RemoteRecord, RemoteStore};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::snapshot::{FileIdentity, Snapshot};
use crate::tracked::{TrackedEntry, TrackedTable};
use crate::types::WatchMode;

/// Counts of what one reconciliation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Remote records created
    pub created: usize,
    /// Remote records deleted
    pub removed: usize,
    /// Remote records re-pointed at a renamed entry
    pub renamed: usize,
    /// Remote records touched for a modification
    pub updated: usize,
    /// Remote calls that failed and will be retried next pass
    pub failed: usize,
}

impl PassOutcome {
    /// Total remote mutations issued successfully.
    pub fn mutations(&self) -> usize {
        self.created + self.removed + self.renamed + self.updated
    }
}

/// Run one reconciliation pass.
///
/// `namespace` is the session's remote subtree; record nodes live at
/// `namespace/<key>`. The table is updated in place to match what the
/// remote store now holds.
pub async fn run_pass(
    store: &dyn RemoteStore,
    namespace: &str,
    mode: WatchMode,
    table: &mut TrackedTable,
    snapshot: &Snapshot,
) -> PassOutcome {
    let mut outcome = PassOutcome::default();

    let vanished: Vec<PathBuf> = table
        .paths()
        .filter(|path| !snapshot.contains_key(*path))
        .cloned()
        .collect();

    // Paths consumed by rename detection, successful or not. Sources are
    // withheld from the removal pass, targets from the addition pass;
    // otherwise a failed rename would tear down the old record or push a
    // duplicate for the new path within the same tick.
    let mut rename_sources: HashSet<PathBuf> = HashSet::new();
    let mut rename_targets: HashSet<PathBuf> = HashSet::new();

    if mode == WatchMode::Folders {
        let identity_index: HashMap<FileIdentity, &PathBuf> = snapshot
            .iter()
            .filter_map(|(path, meta)| meta.identity.map(|id| (id, path)))
            .collect();

        for old_path in &vanished {
            let Some(entry) = table.get(old_path) else {
                continue;
            };
            let Some(identity) = entry.identity else {
                continue;
            };
            let Some(&new_path) = identity_index.get(&identity) else {
                continue;
            };
            if table.contains(new_path) || rename_targets.contains(new_path) {
                continue;
            }

            let key = entry.key.clone();
            let meta = &snapshot[new_path];
            let fields = json!({
                "frequency": meta.frequency.label(),
                "name": entry_name(new_path),
                "path": new_path.display().to_string(),
                "updated_at": chrono::Utc::now().timestamp(),
            });

            rename_sources.insert(old_path.clone());
            rename_targets.insert(new_path.clone());

            match store.update(&record_path(namespace, &key), &fields).await {
                Ok(()) => {
                    table.rekey(old_path, new_path.clone(), meta.frequency, meta.modified);
                    info!(
                        old = %old_path.display(),
                        new = %new_path.display(),
                        key = %key,
                        "Entry renamed, record re-pointed"
                    );
                    outcome.renamed += 1;
                }
                Err(e) => {
                    warn!(
                        old = %old_path.display(),
                        new = %new_path.display(),
                        error = %e,
                        "Rename update failed, will retry next pass"
                    );
                    outcome.failed += 1;
                }
            }
        }
    }

    // Removals: tracked entries gone from disk and not explained by a rename
    for old_path in &vanished {
        if rename_sources.contains(old_path) {
            continue;
        }
        let Some(entry) = table.get(old_path) else {
            continue;
        };
        let key = entry.key.clone();

        match store.delete(&record_path(namespace, &key)).await {
            Ok(()) => {
                table.remove(old_path);
                info!(path = %old_path.display(), key = %key, "Entry removed, record deleted");
                outcome.removed += 1;
            }
            Err(e) => {
                warn!(
                    path = %old_path.display(),
                    error = %e,
                    "Record delete failed, will retry next pass"
                );
                outcome.failed += 1;
            }
        }
    }

    // Additions: snapshot entries not yet tracked
    for (path, meta) in snapshot {
        if table.contains(path) || rename_targets.contains(path) {
            continue;
        }

        let record = RemoteRecord::new(
            meta.frequency,
            entry_name(path),
            path.display().to_string(),
        );
        let value = match serde_json::to_value(&record) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Record serialization failed");
                outcome.failed += 1;
                continue;
            }
        };

        match store.push(namespace, &value).await {
            Ok(key) => {
                info!(path = %path.display(), key = %key, "Tracking new entry");
                table.insert(
                    path.clone(),
                    TrackedEntry {
                        key,
                        frequency: meta.frequency,
                        modified: meta.modified,
                        identity: meta.identity,
                    },
                );
                outcome.created += 1;
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Record create failed, will retry next pass"
                );
                outcome.failed += 1;
            }
        }
    }

    // Modifications: tracked entries whose mtime moved forward
    for (path, meta) in snapshot {
        let Some(entry) = table.get(path) else {
            continue;
        };
        if meta.modified <= entry.modified {
            continue;
        }
        let key = entry.key.clone();

        let fields = json!({ "updated_at": chrono::Utc::now().timestamp() });
        match store.update(&record_path(namespace, &key), &fields).await {
            Ok(()) => {
                debug!(path = %path.display(), "Entry modified, record touched");
                if let Some(entry) = table.get_mut(path) {
                    entry.modified = meta.modified;
                }
                outcome.updated += 1;
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Record touch failed, will retry next pass"
                );
                outcome.failed += 1;
            }
        }
    }

    outcome
}

fn record_path(namespace: &str, key: &str) -> String {
    format!("{namespace}/{key}")
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
