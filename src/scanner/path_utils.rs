//! Lexical path normalization.
//!
//! Candidates and trash records store absolute paths with `.` and `..`
//! resolved textually, without touching the filesystem. Symlinks are not
//! consulted: `a/link/..` becomes `a` even if `link` points elsewhere.
//!
//! ```
//! use nuke::scanner::path_utils::clean;
//! use std::path::Path;
//!
//! assert_eq!(clean(Path::new("/w/a/../b.txt")), Path::new("/w/b.txt"));
//! assert_eq!(clean(Path::new("/../x/./y")), Path::new("/x/y"));
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components lexically.
///
/// `..` at the root stays at the root; leading `..` in a relative path is
/// kept. An empty result becomes `.`.
#[must_use]
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::ParentDir | Component::CurDir) | None => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Make `path` absolute against the working directory, then [`clean`] it.
///
/// # Errors
///
/// Returns the error from resolving the working directory.
pub fn absolute_clean(path: &Path) -> io::Result<PathBuf> {
    std::path::absolute(path).map(|p| clean(&p))
}
