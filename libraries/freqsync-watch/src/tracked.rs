//! Per-session tracked-entry table
//!
//! Binds each mirrored local entry to the remote record key it was created
//! under. The key never changes for the lifetime of the underlying
//! filesystem object, even across renames; only the path it is filed under
//! moves.

use freqsync_core::Frequency;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::snapshot::FileIdentity;

/// One tracked local entry
#[derive(Debug, Clone)]
pub struct TrackedEntry {
    /// Server-generated remote record key; stable for this entry's lifetime
    pub key: String,
    pub frequency: Frequency,
    /// Modification time last written to the remote record
    pub modified: SystemTime,
    pub identity: Option<FileIdentity>,
}

/// Table of tracked entries, keyed by current path.
///
/// Owned exclusively by one session's worker; at most one entry per
/// distinct filesystem identity.
#[derive(Debug, Default)]
pub struct TrackedTable {
    entries: HashMap<PathBuf, TrackedEntry>,
}

impl TrackedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: PathBuf, entry: TrackedEntry) {
        self.entries.insert(path, entry);
    }

    pub fn remove(&mut self, path: &Path) -> Option<TrackedEntry> {
        self.entries.remove(path)
    }

    pub fn get(&self, path: &Path) -> Option<&TrackedEntry> {
        self.entries.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut TrackedEntry> {
        self.entries.get_mut(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Move an entry to a new path, keeping its remote key.
    ///
    /// Returns `false` when `old` is not tracked or `new` already is.
    pub fn rekey(
        &mut self,
        old: &Path,
        new: PathBuf,
        frequency: Frequency,
        modified: SystemTime,
    ) -> bool {
        if self.entries.contains_key(&new) {
            return false;
        }
        let Some(mut entry) = self.entries.remove(old) else {
            return false;
        };
        entry.frequency = frequency;
        entry.modified = modified;
        self.entries.insert(new, entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &TrackedEntry)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.keys()
    }
}
