//! Directory snapshots
//!
//! A snapshot is the set of matching entries under one watched directory
//! at a single point in time, with the metadata the reconciliation pass
//! diffs against: frequency, modification time, and filesystem identity.
//!
//! Entries can disappear between listing and stat (external deletion mid
//! walk); those are skipped silently rather than failing the whole pass.

use freqsync_core::Frequency;
use std::collections::{HashMap, HashSet};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, WatchError};
use crate::types::WatchMode;

/// Stable identity of a filesystem object, used to recognize renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    /// Identity from raw device and inode numbers.
    pub fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    /// Identity of an already-stat'ed entry.
    #[cfg(unix)]
    pub fn of(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    /// No stable identity off Unix; renames surface as delete + create.
    #[cfg(not(unix))]
    pub fn of(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

/// Metadata captured for one matching entry
#[derive(Debug, Clone)]
pub struct EntryMeta {
    pub frequency: Frequency,
    pub modified: SystemTime,
    /// `None` when the platform offers no stable identity; renames then
    /// surface as delete + create
    pub identity: Option<FileIdentity>,
}

/// Matching entries of one directory, keyed by absolute path
pub type Snapshot = HashMap<PathBuf, EntryMeta>;

/// Capture the current matching entries under `dir`.
///
/// Folder mode lists only the top level and requires the whole folder name
/// to be a frequency label; file mode walks recursively and accepts a
/// frequency anywhere in the file name. Paths in `exclude` are never
/// reported.
pub fn capture(dir: &Path, mode: WatchMode, exclude: &HashSet<PathBuf>) -> Result<Snapshot> {
    if !dir.is_dir() {
        return Err(WatchError::InvalidDirectory(dir.to_path_buf()));
    }

    let mut snapshot = Snapshot::new();

    match mode {
        WatchMode::Folders => {
            for entry in std::fs::read_dir(dir)?.filter_map(|e| e.ok()) {
                let path = entry.path();
                if exclude.contains(&path) {
                    continue;
                }
                if let Some(meta) = stat_entry(&path, mode) {
                    snapshot.insert(path, meta);
                }
            }
        }
        WatchMode::Files => {
            for entry in WalkDir::new(dir)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if entry.file_type().is_dir() || exclude.contains(path) {
                    continue;
                }
                if let Some(meta) = stat_entry(path, mode) {
                    snapshot.insert(path.to_path_buf(), meta);
                }
            }
        }
    }

    Ok(snapshot)
}

/// Stat one path and extract its frequency under the given mode's rules.
///
/// Returns `None` for non-matching names, wrong entry kinds, and entries
/// that vanish before they can be stat'ed.
pub(crate) fn stat_entry(path: &Path, mode: WatchMode) -> Option<EntryMeta> {
    let name = path.file_name()?.to_str()?;

    let frequency = match mode {
        WatchMode::Folders => Frequency::parse_exact(name)?,
        WatchMode::Files => Frequency::find_in(name)?,
    };

    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Entry vanished mid-walk, skipping");
            return None;
        }
    };

    let kind_matches = match mode {
        WatchMode::Folders => metadata.is_dir(),
        WatchMode::Files => metadata.is_file(),
    };
    if !kind_matches {
        return None;
    }

    Some(EntryMeta {
        frequency,
        modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        identity: FileIdentity::of(&metadata),
    })
}
