//! Scanner module for candidate discovery.
//!
//! This module provides functionality for:
//! - Resolving a root path into candidate entries
//! - Recursive traversal using jwalk, skipping unreadable descendants
//! - Deepest-first ordering so children always precede their parents
//!
//! # Example
//!
//! ```no_run
//! use nuke::filter::FilterCriteria;
//! use nuke::scanner::Walker;
//! use std::path::Path;
//!
//! let criteria = FilterCriteria::default();
//! let candidates = Walker::new(&criteria).scan(Path::new("build"), true).unwrap();
//! for entry in &candidates {
//!     println!("{}: {} bytes", entry.path.display(), entry.size);
//! }
//! ```

pub mod path_utils;
pub mod walker;

use std::cmp::Ordering;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::ErrorKind;

pub use walker::Walker;

/// One filesystem object slated for an operation.
///
/// Created by the [`Walker`] (or synthesized by a caller) and consumed once
/// by the deletion engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    /// Absolute path
    pub path: PathBuf,
    /// Size in bytes (directories report their entry size)
    pub size: u64,
    /// Permission/mode bits
    pub mode: u32,
    /// Last modification time
    pub modified: SystemTime,
    /// Whether this entry is a directory
    pub is_dir: bool,
}

impl CandidateEntry {
    /// Create a new CandidateEntry with default mode bits.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the entry
    /// * `size` - Size in bytes
    /// * `modified` - Last modification time
    /// * `is_dir` - Whether the entry is a directory
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime, is_dir: bool) -> Self {
        Self {
            path,
            size,
            mode: if is_dir { 0o755 } else { 0o644 },
            modified,
            is_dir,
        }
    }

    /// Build an entry from already-fetched (non-following) metadata.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            path,
            size: metadata.len(),
            mode: mode_bits(metadata),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_dir: metadata.is_dir(),
        }
    }

    /// Stat `path` without following symlinks and build an entry. The
    /// stored path is absolute with `.` and `..` resolved.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] naming `path` if it cannot be statted.
    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let absolute = path_utils::absolute_clean(path).map_err(|e| ScanError::from_io(path, e))?;
        let metadata =
            std::fs::symlink_metadata(&absolute).map_err(|e| ScanError::from_io(&absolute, e))?;
        Ok(Self::from_metadata(absolute, &metadata))
    }

    /// Number of path components, used for depth ordering.
    #[must_use]
    pub fn depth(&self) -> usize {
        path_depth(&self.path)
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, false) => 0o755,
        (true, true) => 0o555,
        (false, false) => 0o644,
        (false, true) => 0o444,
    }
}

/// Number of components in `path`.
#[must_use]
pub fn path_depth(path: &Path) -> usize {
    path.components().count()
}

/// Order entries deepest first, ties broken by descending path.
///
/// Every child therefore precedes its parent directory.
pub fn sort_deepest_first(entries: &mut [CandidateEntry]) {
    entries.sort_by(|a, b| match b.depth().cmp(&a.depth()) {
        Ordering::Equal => b.path.cmp(&a.path),
        other => other,
    });
}

/// Errors that can occur while resolving a scan root.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing the root.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing the root.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the scan failed on.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::Io { path: p, .. } => p,
        }
    }

    /// Classify the error. A missing root is `NotFound`; anything else that
    /// stops a scan is a `Scan` failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied(_) | Self::Io { .. } => ErrorKind::Scan,
        }
    }
}
