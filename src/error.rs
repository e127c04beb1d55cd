//! Error taxonomy shared by every component.
//!
//! Each component owns a `thiserror` enum ([`FilterError`], [`ScanError`],
//! [`TrashError`], [`DeleteError`]). All of them classify into a single
//! [`ErrorKind`] so callers can tally and report failures uniformly.
//!
//! [`FilterError`]: crate::filter::FilterError
//! [`ScanError`]: crate::scanner::ScanError
//! [`TrashError`]: crate::trash::TrashError
//! [`DeleteError`]: crate::actions::DeleteError

use std::path::Path;

use serde::Serialize;

/// Classification of every error the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Target or trash entry absent.
    NotFound,
    /// Restore destination already occupied.
    Conflict,
    /// Metadata record exists but the staged data is gone.
    StaleEntry,
    /// Scan root could not be read.
    Scan,
    /// Generic read/write/rename/sync failure.
    Io,
    /// Malformed size, duration, glob or regex specification.
    InvalidFilter,
}

impl ErrorKind {
    /// Get the machine-readable error code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NK001",
            Self::Conflict => "NK002",
            Self::StaleEntry => "NK003",
            Self::Scan => "NK004",
            Self::Io => "NK005",
            Self::InvalidFilter => "NK006",
        }
    }

    /// Classify an I/O error. Only `NotFound` gets its own kind.
    #[must_use]
    pub fn from_io(error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Io,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::StaleEntry => "stale entry",
            Self::Scan => "scan",
            Self::Io => "i/o",
            Self::InvalidFilter => "invalid filter",
        };
        f.write_str(name)
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "NK001")
    pub code: String,
    /// Classification of the failure
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Path the failure is about, if any
    pub path: Option<String>,
}

impl StructuredError {
    /// Build a structured record from any classified error.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl std::fmt::Display, path: Option<&Path>) -> Self {
        Self {
            code: kind.code().to_string(),
            kind,
            message: message.to_string(),
            path: path.map(|p| p.display().to_string()),
        }
    }
}

impl From<&crate::actions::DeleteError> for StructuredError {
    fn from(err: &crate::actions::DeleteError) -> Self {
        Self::new(err.kind(), err, err.path())
    }
}

impl From<&crate::trash::TrashError> for StructuredError {
    fn from(err: &crate::trash::TrashError) -> Self {
        Self::new(err.kind(), err, err.path())
    }
}

impl From<&crate::scanner::ScanError> for StructuredError {
    fn from(err: &crate::scanner::ScanError) -> Self {
        Self::new(err.kind(), err, Some(err.path()))
    }
}

impl From<&crate::filter::FilterError> for StructuredError {
    fn from(err: &crate::filter::FilterError) -> Self {
        Self::new(err.kind(), err, None)
    }
}
