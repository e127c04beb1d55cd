//! Recoverable holding area for soft-deleted items.
//!
//! # Overview
//!
//! A [`TrashStore`] owns a root directory with two children:
//!
//! - `files/` holds the staged data, each item renamed to
//!   `<nanosecond stamp>_<original base name>`
//! - `meta/` holds one pretty-printed JSON [`TrashEntry`] per staged item,
//!   named `<staged name>.json`
//!
//! The metadata record is the source of truth. A staged file without a
//! record is invisible; a record whose staged data vanished is an orphan,
//! dropped from [`TrashStore::list`] and reported as stale by
//! [`TrashStore::restore`].
//!
//! Stage calls may run concurrently from many workers because every call
//! creates disjoint files. `list`, `evict` and `purge_all` assume no stage is
//! in flight.
//!
//! # Example
//!
//! ```no_run
//! use nuke::trash::{RetentionPolicy, TrashStore};
//! use std::path::Path;
//!
//! let store = TrashStore::open("/tmp/nuke-trash").unwrap();
//! store.stage(Path::new("old.log")).unwrap();
//!
//! let listing = store.list().unwrap();
//! println!("{} item(s), {} bytes", listing.len(), listing.total_size);
//!
//! store.restore("old.log").unwrap();
//! store.evict(&RetentionPolicy::new(30, 5000)).unwrap();
//! ```

pub mod transfer;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;
use crate::scanner::path_utils;
use transfer::{FsOps, MoveError, StdFs};

/// Name of the default trash directory under the home directory.
pub const DEFAULT_TRASH_DIR: &str = ".nuke-trash";

/// Subdirectory holding staged data.
pub const FILES_DIR: &str = "files";

/// Subdirectory holding metadata records.
pub const META_DIR: &str = "meta";

const RECORD_EXTENSION: &str = ".json";

/// Last stamp handed out, so names stay unique within the process.
static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Errors from trash store operations.
#[derive(Debug, Error)]
pub enum TrashError {
    /// The item to stage does not exist.
    #[error("path not found: {0}")]
    SourceMissing(PathBuf),

    /// No trash entry matches the restore query.
    #[error("not found in trash: {0}")]
    NotFound(String),

    /// The original location is already occupied.
    #[error("original location already exists: {0}")]
    Conflict(PathBuf),

    /// The metadata record exists but the staged data is gone.
    #[error("staged data no longer exists: {0}")]
    StaleEntry(PathBuf),

    /// Moving, removing or syncing data failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path the operation failed on
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The data was copied to `to` but `from` could not be fully removed.
    /// Nothing was discarded: `to` holds the complete data and some of it
    /// may also remain at `from`.
    #[error("copied {from} to {to} but could not remove the source: {source}")]
    PartialMove {
        /// Where the data came from
        from: PathBuf,
        /// Where the complete copy now lives
        to: PathBuf,
        /// The removal error
        #[source]
        source: io::Error,
    },

    /// A metadata record could not be encoded.
    #[error("invalid metadata record {path}: {source}")]
    Metadata {
        /// Record path
        path: PathBuf,
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// The staging or metadata directory could not be created.
    #[error("cannot create trash directory {path}: {source}")]
    Structure {
        /// Directory that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl TrashError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn partial_move(from: &Path, to: &Path, source: io::Error) -> Self {
        Self::PartialMove {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }
    }

    /// Path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::SourceMissing(p)
            | Self::Conflict(p)
            | Self::StaleEntry(p)
            | Self::Io { path: p, .. }
            | Self::PartialMove { from: p, .. }
            | Self::Metadata { path: p, .. }
            | Self::Structure { path: p, .. } => Some(p),
            Self::NotFound(_) => None,
        }
    }

    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceMissing(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::StaleEntry(_) => ErrorKind::StaleEntry,
            Self::Io { .. }
            | Self::PartialMove { .. }
            | Self::Metadata { .. }
            | Self::Structure { .. } => ErrorKind::Io,
        }
    }
}

/// Persisted record of one staged item. Write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashEntry {
    /// Absolute path the item was staged from
    pub original_path: PathBuf,
    /// Where the data lives inside `files/`
    pub trash_path: PathBuf,
    /// When the item was staged
    pub deleted_at: DateTime<Utc>,
    /// Size in bytes (recomputed for directories when listing)
    pub size: u64,
    /// Whether the item is a directory
    pub is_dir: bool,
}

impl TrashEntry {
    /// Generated name of the staged data.
    #[must_use]
    pub fn staged_name(&self) -> String {
        self.trash_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether a restore query selects this entry: the original base name
    /// equals `query`, or the full original path contains it.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let base_matches = self
            .original_path
            .file_name()
            .is_some_and(|name| name.to_string_lossy() == query);
        base_matches || self.original_path.to_string_lossy().contains(query)
    }
}

/// Snapshot of the trash contents.
#[derive(Debug, Clone, Default)]
pub struct TrashListing {
    /// Live entries, oldest first
    pub entries: Vec<TrashEntry>,
    /// Sum of entry sizes in bytes
    pub total_size: u64,
}

impl TrashListing {
    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the trash is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Retention rules for [`TrashStore::evict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Entries staged longer ago than this are always evicted
    pub retention_days: u32,
    /// Size cap in bytes enforced after the age sweep
    pub max_size_bytes: u64,
}

impl RetentionPolicy {
    /// Build a policy from a day count and a cap in MiB (1 MiB = 1024*1024).
    #[must_use]
    pub fn new(retention_days: u32, max_size_mb: u64) -> Self {
        Self {
            retention_days,
            max_size_bytes: max_size_mb.saturating_mul(1024 * 1024),
        }
    }
}

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Number of entries permanently removed
    pub items_removed: usize,
    /// Bytes released
    pub bytes_freed: u64,
}

/// Durable index of staged items.
#[derive(Debug, Clone)]
pub struct TrashStore {
    root: PathBuf,
    files_dir: PathBuf,
    meta_dir: PathBuf,
    fs_ops: Arc<dyn FsOps>,
}

/// Default trash root, `~/.nuke-trash`.
#[must_use]
pub fn default_root() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(DEFAULT_TRASH_DIR))
}

impl TrashStore {
    /// Open (creating if needed) a trash store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`TrashError::Structure`] if `files/` or `meta/` cannot be
    /// created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, TrashError> {
        let root = root.into();
        let store = Self {
            files_dir: root.join(FILES_DIR),
            meta_dir: root.join(META_DIR),
            root,
            fs_ops: Arc::new(StdFs),
        };
        store.create_dirs()?;
        log::debug!("Opened trash store at {}", store.root.display());
        Ok(store)
    }

    /// Open the store at [`default_root`].
    ///
    /// # Errors
    ///
    /// Returns [`TrashError::Structure`] if the home directory is unknown or
    /// the directories cannot be created.
    pub fn open_default() -> Result<Self, TrashError> {
        let root = default_root().ok_or_else(|| TrashError::Structure {
            path: PathBuf::from(DEFAULT_TRASH_DIR),
            source: io::Error::new(io::ErrorKind::NotFound, "home directory unavailable"),
        })?;
        Self::open(root)
    }

    /// Use `ops` for the rename and source removal of every move in and out
    /// of the store.
    #[must_use]
    pub fn with_fs_ops(mut self, ops: Arc<dyn FsOps>) -> Self {
        self.fs_ops = ops;
        self
    }

    fn create_dirs(&self) -> Result<(), TrashError> {
        for dir in [&self.files_dir, &self.meta_dir] {
            fs::create_dir_all(dir).map_err(|source| TrashError::Structure {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding staged data.
    #[must_use]
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Directory holding metadata records.
    #[must_use]
    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }

    /// Move `path` into the trash and record it.
    ///
    /// The data move happens first. If writing the record then fails, the
    /// data stays staged but unlisted. If the copy fallback completed but the
    /// source could not be fully removed, the record is still written so the
    /// staged copy stays restorable.
    ///
    /// # Errors
    ///
    /// - [`TrashError::SourceMissing`] if `path` does not exist
    /// - [`TrashError::PartialMove`] if the source outlived a completed copy
    /// - [`TrashError::Io`] if the move or the record write fails
    pub fn stage(&self, path: &Path) -> Result<TrashEntry, TrashError> {
        self.stage_at(path, Utc::now())
    }

    pub(crate) fn stage_at(
        &self,
        path: &Path,
        deleted_at: DateTime<Utc>,
    ) -> Result<TrashEntry, TrashError> {
        let original_path = path_utils::absolute_clean(path).map_err(|e| TrashError::io(path, e))?;
        let metadata = fs::symlink_metadata(&original_path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                TrashError::SourceMissing(original_path.clone())
            } else {
                TrashError::io(&original_path, e)
            }
        })?;

        let base_name = original_path
            .file_name()
            .map_or_else(|| "root".into(), |n| n.to_string_lossy());
        let staged_name = format!("{}_{}", next_stamp(), base_name);
        let trash_path = self.files_dir.join(&staged_name);

        let retained = match transfer::move_path_with(&original_path, &trash_path, &*self.fs_ops) {
            Ok(()) => None,
            Err(MoveError::SourceRetained(e)) => Some(e),
            Err(MoveError::NotMoved(e)) => return Err(TrashError::io(&original_path, e)),
        };

        let is_dir = metadata.is_dir();
        let entry = TrashEntry {
            size: if is_dir {
                transfer::dir_size(&trash_path)
            } else {
                metadata.len()
            },
            original_path,
            trash_path,
            deleted_at,
            is_dir,
        };

        self.write_record(&staged_name, &entry).inspect_err(|e| {
            log::warn!(
                "{} was staged but its record was not written: {}",
                entry.original_path.display(),
                e
            );
        })?;

        if let Some(e) = retained {
            return Err(TrashError::partial_move(&entry.original_path, &entry.trash_path, e));
        }

        log::info!(
            "Staged {} as {}",
            entry.original_path.display(),
            staged_name
        );
        Ok(entry)
    }

    fn record_path(&self, staged_name: &str) -> PathBuf {
        self.meta_dir.join(format!("{staged_name}{RECORD_EXTENSION}"))
    }

    /// Write a record through a synced temp file so readers never see a
    /// truncated record.
    fn write_record(&self, staged_name: &str, entry: &TrashEntry) -> Result<(), TrashError> {
        let record_path = self.record_path(staged_name);
        let temp_path = self.meta_dir.join(format!(".{staged_name}{RECORD_EXTENSION}.tmp"));

        let data = serde_json::to_vec_pretty(entry).map_err(|source| TrashError::Metadata {
            path: record_path.clone(),
            source,
        })?;

        let result = File::create(&temp_path)
            .and_then(|mut file| {
                file.write_all(&data)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp_path, &record_path));

        result.map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            TrashError::io(&record_path, e)
        })
    }

    /// Read every parseable record, in file-name (staging) order.
    fn read_records(&self) -> Result<Vec<(PathBuf, TrashEntry)>, TrashError> {
        let mut record_paths: Vec<PathBuf> = fs::read_dir(&self.meta_dir)
            .map_err(|e| TrashError::io(&self.meta_dir, e))?
            .filter_map(Result::ok)
            .map(|dirent| dirent.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(RECORD_EXTENSION) && !n.starts_with('.'))
            })
            .collect();
        record_paths.sort();

        let mut records = Vec::with_capacity(record_paths.len());
        for path in record_paths {
            let parsed = fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|data| {
                    serde_json::from_slice::<TrashEntry>(&data).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(entry) => records.push((path, entry)),
                Err(e) => log::warn!("Ignoring unreadable trash record {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }

    /// List live entries, oldest first, with their total size.
    ///
    /// Records whose staged data has vanished are dropped. Directory sizes
    /// are recomputed from the staged tree.
    ///
    /// # Errors
    ///
    /// Returns [`TrashError::Io`] if the metadata directory cannot be read.
    pub fn list(&self) -> Result<TrashListing, TrashError> {
        let mut listing = TrashListing::default();

        for (record_path, mut entry) in self.read_records()? {
            match fs::symlink_metadata(&entry.trash_path) {
                Ok(metadata) => {
                    if metadata.is_dir() {
                        entry.size = transfer::dir_size(&entry.trash_path);
                    }
                    listing.total_size += entry.size;
                    listing.entries.push(entry);
                }
                Err(_) => {
                    log::warn!(
                        "Orphaned trash record {} (staged data missing)",
                        record_path.display()
                    );
                }
            }
        }

        listing.entries.sort_by_key(|entry| entry.deleted_at);
        Ok(listing)
    }

    /// Restore the first entry whose original base name equals `query` or
    /// whose original path contains it.
    ///
    /// Missing parent directories are recreated. The record is removed only
    /// after the data is back in place and the staged copy is gone. When the
    /// copy fallback restored everything but the staged data could not be
    /// fully removed, the record is kept so the leftover stays tracked.
    ///
    /// # Errors
    ///
    /// - [`TrashError::NotFound`] if nothing matches
    /// - [`TrashError::StaleEntry`] if the staged data is gone
    /// - [`TrashError::Conflict`] if the original location is occupied
    /// - [`TrashError::PartialMove`] if the staged data outlived a completed
    ///   copy back
    /// - [`TrashError::Io`] if the move back or record removal fails
    pub fn restore(&self, query: &str) -> Result<TrashEntry, TrashError> {
        if query.is_empty() {
            return Err(TrashError::NotFound(query.to_string()));
        }

        let (record_path, entry) = self
            .read_records()?
            .into_iter()
            .find(|(_, entry)| entry.matches(query))
            .ok_or_else(|| TrashError::NotFound(query.to_string()))?;

        if let Err(e) = fs::symlink_metadata(&entry.trash_path) {
            return Err(if e.kind() == io::ErrorKind::NotFound {
                TrashError::StaleEntry(entry.trash_path)
            } else {
                TrashError::io(&entry.trash_path, e)
            });
        }

        if fs::symlink_metadata(&entry.original_path).is_ok() {
            return Err(TrashError::Conflict(entry.original_path));
        }

        if let Some(parent) = entry.original_path.parent() {
            fs::create_dir_all(parent).map_err(|e| TrashError::io(parent, e))?;
        }

        transfer::move_path_with(&entry.trash_path, &entry.original_path, &*self.fs_ops).map_err(
            |e| match e {
                MoveError::SourceRetained(source) => {
                    TrashError::partial_move(&entry.trash_path, &entry.original_path, source)
                }
                MoveError::NotMoved(source) => TrashError::io(&entry.original_path, source),
            },
        )?;

        fs::remove_file(&record_path).map_err(|e| TrashError::io(&record_path, e))?;

        log::info!("Restored {}", entry.original_path.display());
        Ok(entry)
    }

    /// Run a retention sweep against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`TrashError::Io`] if the metadata directory cannot be read.
    pub fn evict(&self, policy: &RetentionPolicy) -> Result<EvictionReport, TrashError> {
        self.evict_at(Utc::now(), policy)
    }

    /// Run a two-phase retention sweep as of `now`.
    ///
    /// Phase one removes every entry staged before `now - retention_days`.
    /// Phase two, only while the remaining total exceeds the size cap,
    /// removes further entries oldest first until the total fits. Entries
    /// whose data cannot be removed are kept and logged.
    ///
    /// # Errors
    ///
    /// Returns [`TrashError::Io`] if the metadata directory cannot be read.
    pub fn evict_at(
        &self,
        now: DateTime<Utc>,
        policy: &RetentionPolicy,
    ) -> Result<EvictionReport, TrashError> {
        let listing = self.list()?;
        let cutoff = now - Duration::days(i64::from(policy.retention_days));
        let mut report = EvictionReport::default();
        let mut remaining_size = listing.total_size;
        let mut survivors = Vec::new();

        for entry in listing.entries {
            if entry.deleted_at < cutoff {
                if self.discard(&entry) {
                    report.items_removed += 1;
                    report.bytes_freed += entry.size;
                    remaining_size = remaining_size.saturating_sub(entry.size);
                }
            } else {
                survivors.push(entry);
            }
        }

        for entry in survivors {
            if remaining_size <= policy.max_size_bytes {
                break;
            }
            if self.discard(&entry) {
                report.items_removed += 1;
                report.bytes_freed += entry.size;
                remaining_size = remaining_size.saturating_sub(entry.size);
            }
        }

        log::info!(
            "Evicted {} item(s), freed {} bytes",
            report.items_removed,
            report.bytes_freed
        );
        Ok(report)
    }

    /// Permanently remove an entry's data, then its record.
    fn discard(&self, entry: &TrashEntry) -> bool {
        match transfer::remove_path(&entry.trash_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                log::warn!(
                    "Could not evict {}: {}",
                    entry.trash_path.display(),
                    e
                );
                return false;
            }
        }

        let record_path = self.record_path(&entry.staged_name());
        if let Err(e) = fs::remove_file(&record_path) {
            log::warn!("Could not remove record {}: {}", record_path.display(), e);
        }
        log::debug!("Evicted {}", entry.original_path.display());
        true
    }

    /// Remove everything staged and recreate empty directories.
    ///
    /// # Errors
    ///
    /// Returns [`TrashError::Io`] if a tree cannot be removed, or
    /// [`TrashError::Structure`] if it cannot be recreated.
    pub fn purge_all(&self) -> Result<(), TrashError> {
        for dir in [&self.files_dir, &self.meta_dir] {
            match fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(TrashError::io(dir, e)),
            }
        }
        self.create_dirs()?;
        log::info!("Purged trash at {}", self.root.display());
        Ok(())
    }
}

/// Next strictly increasing nanosecond stamp.
fn next_stamp() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));

    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}
