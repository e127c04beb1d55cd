//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, which turns a root path into
//! an ordered list of [`CandidateEntry`] values admitted by a
//! [`FilterCriteria`].
//!
//! - A regular file (or symlink) root yields at most one candidate.
//! - A directory root without recursion yields the directory itself.
//! - A directory root with recursion yields every admitted file and
//!   directory in the subtree, the root included.
//!
//! Only a failure to stat the root is an error. Unreadable descendants are
//! logged and skipped so one bad permission cannot abort a large scan.
//!
//! Results of [`Walker::scan`] are always ordered deepest first, ties broken
//! by descending path, so children precede their parents.

use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use super::{sort_deepest_first, CandidateEntry, ScanError};
use crate::filter::FilterCriteria;

/// Filtered scanner over a root path.
#[derive(Debug, Clone, Copy)]
pub struct Walker<'a> {
    /// Selector applied to every visited entry
    criteria: &'a FilterCriteria,
}

impl<'a> Walker<'a> {
    /// Create a new walker applying `criteria`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nuke::filter::FilterCriteria;
    /// use nuke::scanner::Walker;
    ///
    /// let criteria = FilterCriteria::default();
    /// let walker = Walker::new(&criteria);
    /// ```
    #[must_use]
    pub fn new(criteria: &'a FilterCriteria) -> Self {
        Self { criteria }
    }

    /// Scan `root` and return admitted candidates, deepest first.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] naming the root if it cannot be statted.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nuke::filter::FilterCriteria;
    /// use nuke::scanner::Walker;
    /// use std::path::Path;
    ///
    /// let criteria = FilterCriteria::default();
    /// let files = Walker::new(&criteria).scan(Path::new("target"), true).unwrap();
    /// println!("Found {} candidates", files.len());
    /// ```
    pub fn scan(&self, root: &Path, recursive: bool) -> Result<Vec<CandidateEntry>, ScanError> {
        let mut entries = Vec::new();
        self.scan_each(root, recursive, |entry| entries.push(entry))?;
        sort_deepest_first(&mut entries);
        log::debug!(
            "Scan of {} produced {} candidate(s)",
            root.display(),
            entries.len()
        );
        Ok(entries)
    }

    /// Visit admitted candidates in traversal order without sorting.
    ///
    /// Returns the number of candidates passed to `visit`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] naming the root if it cannot be statted.
    pub fn scan_each<F>(&self, root: &Path, recursive: bool, mut visit: F) -> Result<usize, ScanError>
    where
        F: FnMut(CandidateEntry),
    {
        let root_entry = CandidateEntry::from_path(root).inspect_err(|e| {
            log::warn!("Cannot scan {}: {}", root.display(), e);
        })?;

        if !root_entry.is_dir || !recursive {
            return Ok(self.offer(root_entry, &mut visit));
        }

        let mut count = 0;
        let walk_dir = WalkDir::new(&root_entry.path)
            .follow_links(false)
            .skip_hidden(false)
            .sort(true);

        for entry_result in walk_dir {
            match entry_result {
                Ok(entry) => {
                    let path = entry.path();
                    if let Some(candidate) = self.stat_descendant(path) {
                        count += self.offer(candidate, &mut visit);
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| root_entry.path.clone(), Path::to_path_buf);
                    log::warn!("Skipping unreadable entry {}: {}", path.display(), e);
                }
            }
        }

        Ok(count)
    }

    /// Apply the selector and forward admitted entries.
    fn offer<F>(&self, entry: CandidateEntry, visit: &mut F) -> usize
    where
        F: FnMut(CandidateEntry),
    {
        if self.criteria.admits(&entry) {
            visit(entry);
            1
        } else {
            0
        }
    }

    /// Stat a descendant, skipping it on failure.
    fn stat_descendant(&self, path: PathBuf) -> Option<CandidateEntry> {
        match std::fs::symlink_metadata(&path) {
            Ok(metadata) => Some(CandidateEntry::from_metadata(path, &metadata)),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                log::warn!("Permission denied, skipping: {}", path.display());
                None
            }
            Err(e) => {
                log::debug!("Skipping {} ({})", path.display(), e);
                None
            }
        }
    }
}
