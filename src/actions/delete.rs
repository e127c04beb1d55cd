//! Concurrent deletion engine.
//!
//! # Overview
//!
//! [`DeleteEngine`] applies one [`Disposition`] to a list of candidates:
//! - Soft delete stages each candidate into a [`TrashStore`] (recoverable).
//!   Without a store it degrades to direct, irreversible removal.
//! - Secure erase overwrites each file three times before unlinking it.
//!   Shredded data is never staged.
//!
//! Files are processed first on a bounded worker pool. Directories follow,
//! one at a time and deepest first, so a directory is only touched after
//! every file inside it was handled. Each candidate succeeds or fails on its
//! own and the batch always runs to the end.
//!
//! # Example
//!
//! ```no_run
//! use nuke::actions::{DeleteEngine, DeleteError, Disposition};
//! use nuke::filter::FilterCriteria;
//! use nuke::scanner::Walker;
//! use nuke::trash::TrashStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let criteria = FilterCriteria::default();
//! let candidates = Walker::new(&criteria).scan(Path::new("build"), true).unwrap();
//!
//! let engine = DeleteEngine::new(Disposition::SoftDelete)
//!     .with_workers(4)
//!     .with_trash(Arc::new(TrashStore::open_default().unwrap()));
//!
//! let report = |path: &Path, error: Option<&DeleteError>| match error {
//!     Some(e) => eprintln!("{}: {}", path.display(), e),
//!     None => println!("removed {}", path.display()),
//! };
//! let result = engine.apply(&candidates, &report);
//! println!("{}", result.summary());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytesize::ByteSize;
use rayon::prelude::*;
use thiserror::Error;

use super::shred;
use crate::error::{ErrorKind, StructuredError};
use crate::scanner::{sort_deepest_first, CandidateEntry};
use crate::trash::{TrashError, TrashStore};

/// Worker count used when none (or zero) is configured.
pub const DEFAULT_WORKERS: usize = 8;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// The candidate no longer exists.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Staging into the trash failed.
    #[error("trash operation failed for {path}: {source}")]
    Trash {
        /// Candidate path
        path: PathBuf,
        /// The trash store error
        #[source]
        source: TrashError,
    },

    /// An overwrite pass or the final unlink failed.
    #[error("secure erase failed for {path}: {source}")]
    Shred {
        /// Candidate path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Candidate path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Trash { path: p, .. }
            | Self::Shred { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
        }
    }

    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Trash { source, .. } => source.kind(),
            Self::PermissionDenied(_) | Self::Shred { .. } | Self::Io { .. } => ErrorKind::Io,
        }
    }
}

/// What happens to each candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Disposition {
    /// Stage into the trash store (or remove directly without one).
    #[default]
    SoftDelete,
    /// Overwrite then unlink. Never staged.
    SecureErase,
}

/// Result of a successful deletion operation.
#[derive(Debug, Clone)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size in bytes as recorded by the scan.
    pub size: u64,
    /// Whether the candidate was a directory.
    pub is_dir: bool,
    /// Disposition that was applied.
    pub disposition: Disposition,
    /// Where the data was staged, for soft deletes through a trash store.
    pub staged_at: Option<PathBuf>,
}

impl DeleteResult {
    /// Create a new delete result.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, disposition: Disposition) -> Self {
        Self {
            path,
            size,
            is_dir: false,
            disposition,
            staged_at: None,
        }
    }

    /// Bytes this deletion counts toward the batch total. Directories count
    /// as zero; the files inside them are tallied individually.
    #[must_use]
    pub fn freed_bytes(&self) -> u64 {
        if self.is_dir {
            0
        } else {
            self.size
        }
    }

    /// Whether the data can be restored from the trash.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.staged_at.is_some()
    }
}

/// Results of a batch deletion operation.
#[derive(Debug, Clone, Default)]
pub struct BatchDeleteResult {
    /// Successfully deleted candidates.
    pub successes: Vec<DeleteResult>,
    /// Failed candidates with their errors.
    pub failures: Vec<(PathBuf, StructuredError)>,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl BatchDeleteResult {
    /// Number of successful deletions.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed deletions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Total number of attempted deletions.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Check if all deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!(
                "Deleted {} item(s), freed {}",
                self.success_count(),
                ByteSize::b(self.bytes_freed)
            )
        } else {
            format!(
                "Deleted {} item(s), {} failed, freed {}",
                self.success_count(),
                self.failure_count(),
                ByteSize::b(self.bytes_freed)
            )
        }
    }

    fn record(&mut self, path: &Path, outcome: Result<DeleteResult, DeleteError>) {
        match outcome {
            Ok(deleted) => {
                self.bytes_freed += deleted.freed_bytes();
                self.successes.push(deleted);
            }
            Err(e) => {
                self.failures
                    .push((path.to_path_buf(), StructuredError::from(&e)));
            }
        }
    }
}

/// Callback trait for deletion progress reporting.
///
/// Invoked concurrently from worker threads; implementations that
/// accumulate state must synchronise internally.
pub trait DeleteProgressCallback: Send + Sync {
    /// Called before a candidate is processed.
    fn on_before_delete(&self, _path: &Path) {}

    /// Called once per candidate with its error, or `None` on success.
    fn on_outcome(&self, path: &Path, error: Option<&DeleteError>);

    /// Called when the batch completes.
    fn on_complete(&self, _result: &BatchDeleteResult) {}
}

impl<F> DeleteProgressCallback for F
where
    F: Fn(&Path, Option<&DeleteError>) + Send + Sync,
{
    fn on_outcome(&self, path: &Path, error: Option<&DeleteError>) {
        self(path, error);
    }
}

/// Callback that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl DeleteProgressCallback for NoProgress {
    fn on_outcome(&self, _path: &Path, _error: Option<&DeleteError>) {}
}

/// Applies a disposition to candidates with bounded concurrency.
#[derive(Debug, Clone)]
pub struct DeleteEngine {
    workers: usize,
    disposition: Disposition,
    trash: Option<Arc<TrashStore>>,
}

impl Default for DeleteEngine {
    fn default() -> Self {
        Self::new(Disposition::default())
    }
}

impl DeleteEngine {
    /// Create an engine with [`DEFAULT_WORKERS`] workers and no trash store.
    #[must_use]
    pub fn new(disposition: Disposition) -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            disposition,
            trash: None,
        }
    }

    /// Set the worker count. Zero selects [`DEFAULT_WORKERS`].
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { DEFAULT_WORKERS } else { workers };
        self
    }

    /// Stage soft deletes into `trash`.
    #[must_use]
    pub fn with_trash(mut self, trash: Arc<TrashStore>) -> Self {
        self.trash = Some(trash);
        self
    }

    /// Configured worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Configured disposition.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Trash store used for soft deletes, if any.
    #[must_use]
    pub fn trash(&self) -> Option<&TrashStore> {
        self.trash.as_deref()
    }

    /// Apply the disposition to every candidate.
    ///
    /// Files run on a pool of [`workers`](Self::workers) threads, then
    /// directories run sequentially, deepest first. `callback` hears about
    /// every candidate exactly once, then receives the tally.
    pub fn apply<C>(&self, candidates: &[CandidateEntry], callback: &C) -> BatchDeleteResult
    where
        C: DeleteProgressCallback + ?Sized,
    {
        let (dirs, files): (Vec<&CandidateEntry>, Vec<&CandidateEntry>) =
            candidates.iter().partition(|entry| entry.is_dir);

        log::debug!(
            "Deleting {} file(s) and {} dir(s) with {} worker(s)",
            files.len(),
            dirs.len(),
            self.workers
        );

        let process_files = || {
            files
                .par_iter()
                .map(|entry| (entry.path.as_path(), self.process(entry, callback)))
                .collect::<Vec<_>>()
        };

        let file_outcomes = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool.install(process_files),
            Err(e) => {
                log::warn!(
                    "Failed to create worker pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                process_files()
            }
        };

        let mut result = BatchDeleteResult::default();
        for (path, outcome) in file_outcomes {
            result.record(path, outcome);
        }

        let mut ordered: Vec<CandidateEntry> = dirs.into_iter().cloned().collect();
        sort_deepest_first(&mut ordered);
        for entry in &ordered {
            let outcome = self.process(entry, callback);
            result.record(&entry.path, outcome);
        }

        log::info!("{}", result.summary());
        callback.on_complete(&result);
        result
    }

    fn process<C>(&self, entry: &CandidateEntry, callback: &C) -> Result<DeleteResult, DeleteError>
    where
        C: DeleteProgressCallback + ?Sized,
    {
        callback.on_before_delete(&entry.path);
        let outcome = self.dispose(entry);
        match &outcome {
            Ok(_) => callback.on_outcome(&entry.path, None),
            Err(e) => {
                log::warn!("Failed to delete {}: {}", entry.path.display(), e);
                callback.on_outcome(&entry.path, Some(e));
            }
        }
        outcome
    }

    /// Apply the disposition to a single candidate.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the candidate vanished
    /// - `Trash` if staging fails
    /// - `Shred` if an overwrite pass or the unlink fails
    /// - `Io`/`PermissionDenied` for direct removals
    pub fn dispose(&self, entry: &CandidateEntry) -> Result<DeleteResult, DeleteError> {
        let path = entry.path.as_path();
        let mut deleted = DeleteResult::new(entry.path.clone(), entry.size, self.disposition);
        deleted.is_dir = entry.is_dir;

        match (self.disposition, self.trash.as_deref()) {
            (Disposition::SecureErase, _) => secure_erase(entry)?,
            (Disposition::SoftDelete, Some(trash)) => {
                let staged = trash.stage(path).map_err(|source| DeleteError::Trash {
                    path: entry.path.clone(),
                    source,
                })?;
                deleted.staged_at = Some(staged.trash_path);
            }
            (Disposition::SoftDelete, None) => {
                log::debug!(
                    "No trash store configured, removing {} permanently",
                    path.display()
                );
                remove_direct(entry)?;
            }
        }

        log::debug!("Deleted {} ({:?})", path.display(), self.disposition);
        Ok(deleted)
    }
}

/// Shred a regular file. Directories and symlinks are removed without
/// touching what they point at or contain.
fn secure_erase(entry: &CandidateEntry) -> Result<(), DeleteError> {
    let path = entry.path.as_path();
    let metadata = fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;

    if metadata.is_dir() || metadata.file_type().is_symlink() {
        return remove_direct(entry);
    }

    shred::shred_file(path, entry.size).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => DeleteError::NotFound(entry.path.clone()),
        _ => DeleteError::Shred {
            path: entry.path.clone(),
            source,
        },
    })
}

/// Non-recursive removal: a non-empty directory is an error.
fn remove_direct(entry: &CandidateEntry) -> Result<(), DeleteError> {
    let path = entry.path.as_path();
    let result = if entry.is_dir {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| DeleteError::from_io(path, e))
}
