//! Moving data in and out of the staging area.
//!
//! A move is an atomic rename when source and destination share a volume.
//! When the rename fails the move degrades to a recursive copy followed by
//! removal of the source. That fallback is not atomic: a crash part way
//! through can leave a partial copy next to a partially removed source.
//!
//! Once the copy is complete it is never discarded. If removing the source
//! then fails, [`MoveError::SourceRetained`] reports that the full data now
//! lives at the destination while some of it may still remain at the source.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use walkdir::WalkDir;

/// Filesystem primitives a move is built from.
///
/// [`StdFs`] uses the real filesystem. Other implementations let callers
/// force the copy fallback or a failing source removal.
pub trait FsOps: fmt::Debug + Send + Sync {
    /// Rename `from` to `to` in one step.
    ///
    /// # Errors
    ///
    /// Returns the rename error, typically a cross-device failure.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    /// Remove `path` and everything below it.
    ///
    /// # Errors
    ///
    /// Returns the first removal error; earlier removals are not undone.
    fn remove(&self, path: &Path) -> io::Result<()> {
        remove_path(path)
    }
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FsOps for StdFs {}

/// Why a move did not complete.
#[derive(Debug, Error)]
pub enum MoveError {
    /// Nothing was moved. `src` is untouched and no copy remains at `dst`.
    #[error("{0}")]
    NotMoved(#[source] io::Error),

    /// `dst` holds a complete copy but `src` could not be fully removed.
    #[error("copied, but the source could not be removed: {0}")]
    SourceRetained(#[source] io::Error),
}

impl MoveError {
    /// The underlying I/O error.
    #[must_use]
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::NotMoved(e) | Self::SourceRetained(e) => e,
        }
    }

    /// Whether the destination holds the complete data.
    #[must_use]
    pub fn is_copied(&self) -> bool {
        matches!(self, Self::SourceRetained(_))
    }

    /// Convert into the underlying I/O error.
    #[must_use]
    pub fn into_io(self) -> io::Error {
        match self {
            Self::NotMoved(e) | Self::SourceRetained(e) => e,
        }
    }
}

/// Move `src` to `dst`, renaming when possible and copying otherwise.
///
/// # Errors
///
/// See [`move_path_with`].
pub fn move_path(src: &Path, dst: &Path) -> Result<(), MoveError> {
    move_path_with(src, dst, &StdFs)
}

/// [`move_path`] over explicit filesystem primitives.
///
/// # Errors
///
/// - [`MoveError::NotMoved`] if the source is missing or the copy fails
///   (the partial copy is removed)
/// - [`MoveError::SourceRetained`] if the copy succeeded but removing the
///   source failed; the copy is kept
pub fn move_path_with<F>(src: &Path, dst: &Path, ops: &F) -> Result<(), MoveError>
where
    F: FsOps + ?Sized,
{
    let rename_err = match ops.rename(src, dst) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    // Nothing to copy if the source itself is gone.
    fs::symlink_metadata(src).map_err(MoveError::NotMoved)?;

    log::debug!(
        "Rename {} -> {} failed ({}), falling back to copy",
        src.display(),
        dst.display(),
        rename_err
    );

    if let Err(e) = copy_path(src, dst) {
        let _ = remove_path(dst);
        return Err(MoveError::NotMoved(e));
    }

    if let Err(e) = ops.remove(src) {
        log::warn!(
            "Copied {} to {} but could not remove the source: {}",
            src.display(),
            dst.display(),
            e
        );
        return Err(MoveError::SourceRetained(e));
    }

    Ok(())
}

/// Recursively copy `src` to `dst` without following symlinks.
///
/// Regular files keep their permissions; directories are recreated with the
/// source's permissions; symlinks are recreated as symlinks on unix.
///
/// # Errors
///
/// Returns the first I/O error encountered.
pub fn copy_path(src: &Path, dst: &Path) -> io::Result<()> {
    // Applied last so read-only directories can still be filled.
    let mut dir_permissions = Vec::new();

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = if relative.as_os_str().is_empty() {
            dst.to_path_buf()
        } else {
            dst.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            let permissions = entry.metadata().map_err(io::Error::from)?.permissions();
            dir_permissions.push((target, permissions));
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    for (dir, permissions) in dir_permissions.into_iter().rev() {
        fs::set_permissions(dir, permissions)?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let link_target = fs::read_link(src)?;
    std::os::unix::fs::symlink(link_target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}

/// Remove a file, symlink or whole directory tree.
///
/// # Errors
///
/// Returns the underlying I/O error, including `NotFound`.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Total size of the regular files under `path`. Unreadable entries count
/// as zero.
#[must_use]
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
