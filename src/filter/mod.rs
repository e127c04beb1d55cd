//! Candidate selection.
//!
//! [`FilterCriteria`] is an immutable predicate set built once per operation
//! and evaluated against every [`CandidateEntry`] the walker produces.
//! Evaluation order (first failing check rejects):
//!
//! 1. Hidden-file suppression (base name starts with `.`)
//! 2. Older-than cutoff (reject entries modified after it)
//! 3. Newer-than cutoff (reject entries modified before it)
//! 4. Size threshold, strict comparison, files only
//! 5. Include globs (base name or full path must match one)
//! 6. Exclude globs (base name or full path must match none)
//! 7. Regular expression (full path or base name must match)
//!
//! Admission is the logical AND of every configured check, so the order
//! only affects short-circuiting.
//!
//! # Example
//!
//! ```
//! use nuke::filter::{FilterSpec, FilterCriteria};
//! use std::time::SystemTime;
//!
//! let spec = FilterSpec {
//!     size: Some("+1M".to_string()),
//!     exclude: vec!["*.keep".to_string()],
//!     ..Default::default()
//! };
//! let criteria: FilterCriteria = spec.compile(SystemTime::now()).unwrap();
//! assert!(criteria.size.is_some());
//! ```

pub mod parse;

use std::path::Path;
use std::time::SystemTime;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::scanner::CandidateEntry;

/// Errors raised while building a [`FilterCriteria`].
#[derive(Debug, Error)]
pub enum FilterError {
    /// A size value could not be parsed.
    #[error("invalid size '{input}': {reason}")]
    InvalidSize { input: String, reason: String },

    /// A duration value could not be parsed.
    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },

    /// A glob pattern failed to compile.
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A regular expression failed to compile.
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl FilterError {
    pub(crate) fn invalid_size(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSize {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_duration(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Every filter error is an invalid filter specification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidFilter
    }
}

/// Direction of a size comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeDirection {
    /// Admit files strictly larger than the threshold.
    Greater,
    /// Admit files strictly smaller than the threshold.
    Less,
}

/// Size threshold applied to regular files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeFilter {
    /// Threshold in bytes. Zero disables the filter.
    pub threshold: u64,
    /// Comparison direction.
    pub direction: SizeDirection,
}

impl SizeFilter {
    /// Create a new size filter.
    #[must_use]
    pub fn new(threshold: u64, direction: SizeDirection) -> Self {
        Self {
            threshold,
            direction,
        }
    }

    /// Strictly-greater-than filter.
    #[must_use]
    pub fn greater_than(threshold: u64) -> Self {
        Self::new(threshold, SizeDirection::Greater)
    }

    /// Strictly-less-than filter.
    #[must_use]
    pub fn less_than(threshold: u64) -> Self {
        Self::new(threshold, SizeDirection::Less)
    }

    /// Check a file size against the threshold.
    #[must_use]
    pub fn passes(&self, size: u64) -> bool {
        if self.threshold == 0 {
            return true;
        }
        match self.direction {
            SizeDirection::Greater => size > self.threshold,
            SizeDirection::Less => size < self.threshold,
        }
    }
}

/// A compiled set of glob patterns matched against base names and full paths.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PatternSet {
    /// Compile patterns. `*` and `?` never cross a path separator.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidGlob`] for the first malformed pattern.
    pub fn new(patterns: Vec<String>) -> Result<Self, FilterError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| FilterError::InvalidGlob {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| FilterError::InvalidGlob {
            pattern: patterns.join(", "),
            source,
        })?;
        Ok(Self { patterns, set })
    }

    /// Source patterns, in the order given.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether no patterns are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if the base name or the full path matches any pattern.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name() {
            if self.set.is_match(Path::new(name)) {
                return true;
            }
        }
        self.set.is_match(path)
    }
}

/// Immutable predicate set deciding which entries are candidates.
///
/// The default criteria admit everything.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Reject entries whose base name starts with `.`.
    pub skip_hidden: bool,
    /// Admit only entries modified at or before this instant.
    pub older_than: Option<SystemTime>,
    /// Admit only entries modified at or after this instant.
    pub newer_than: Option<SystemTime>,
    /// Size threshold for regular files.
    pub size: Option<SizeFilter>,
    include: Option<PatternSet>,
    exclude: Option<PatternSet>,
    /// Must match the full path or the base name.
    pub regex: Option<Regex>,
}

impl FilterCriteria {
    /// Criteria that admit every entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable hidden-file suppression.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }

    /// Set the older-than cutoff.
    #[must_use]
    pub fn with_older_than(mut self, cutoff: Option<SystemTime>) -> Self {
        self.older_than = cutoff;
        self
    }

    /// Set the newer-than cutoff.
    #[must_use]
    pub fn with_newer_than(mut self, cutoff: Option<SystemTime>) -> Self {
        self.newer_than = cutoff;
        self
    }

    /// Set the size filter.
    #[must_use]
    pub fn with_size(mut self, size: Option<SizeFilter>) -> Self {
        self.size = size;
        self
    }

    /// Set the regular expression filter.
    #[must_use]
    pub fn with_regex(mut self, regex: Option<Regex>) -> Self {
        self.regex = regex;
        self
    }

    /// Set the include globs. An empty list disables the check.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidGlob`] if a pattern is malformed.
    pub fn with_include(mut self, patterns: Vec<String>) -> Result<Self, FilterError> {
        self.include = Self::compile_patterns(patterns)?;
        Ok(self)
    }

    /// Set the exclude globs. An empty list disables the check.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidGlob`] if a pattern is malformed.
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Result<Self, FilterError> {
        self.exclude = Self::compile_patterns(patterns)?;
        Ok(self)
    }

    fn compile_patterns(patterns: Vec<String>) -> Result<Option<PatternSet>, FilterError> {
        if patterns.is_empty() {
            Ok(None)
        } else {
            PatternSet::new(patterns).map(Some)
        }
    }

    /// Configured include globs.
    #[must_use]
    pub fn include(&self) -> Option<&PatternSet> {
        self.include.as_ref()
    }

    /// Configured exclude globs.
    #[must_use]
    pub fn exclude(&self) -> Option<&PatternSet> {
        self.exclude.as_ref()
    }

    /// Decide whether `entry` is admitted.
    #[must_use]
    pub fn admits(&self, entry: &CandidateEntry) -> bool {
        let path = entry.path.as_path();

        if self.skip_hidden && is_hidden(path) {
            log::trace!("Rejected hidden entry: {}", path.display());
            return false;
        }

        if let Some(cutoff) = self.older_than {
            if entry.modified > cutoff {
                log::trace!("Rejected by older-than cutoff: {}", path.display());
                return false;
            }
        }

        if let Some(cutoff) = self.newer_than {
            if entry.modified < cutoff {
                log::trace!("Rejected by newer-than cutoff: {}", path.display());
                return false;
            }
        }

        if let Some(size) = self.size {
            if !entry.is_dir && !size.passes(entry.size) {
                log::trace!(
                    "Rejected by size filter ({} bytes): {}",
                    entry.size,
                    path.display()
                );
                return false;
            }
        }

        if let Some(include) = &self.include {
            if !include.matches(path) {
                log::trace!("Not matched by include patterns: {}", path.display());
                return false;
            }
        }

        if let Some(exclude) = &self.exclude {
            if exclude.matches(path) {
                log::trace!("Matched by exclude patterns: {}", path.display());
                return false;
            }
        }

        if let Some(re) = &self.regex {
            let full = path.to_string_lossy();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default();
            if !re.is_match(&full) && !re.is_match(&name) {
                log::trace!("Not matched by regex: {}", path.display());
                return false;
            }
        }

        true
    }
}

/// Free-function form of [`FilterCriteria::admits`].
#[must_use]
pub fn admits(entry: &CandidateEntry, criteria: &FilterCriteria) -> bool {
    criteria.admits(entry)
}

/// Whether the base name of `path` starts with `.`.
#[must_use]
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Raw, user-facing filter description.
///
/// Compiled exactly once into a [`FilterCriteria`]; every malformed value is
/// reported before any scanning begins.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    /// Admit only entries older than this duration (e.g. `30d`).
    pub older_than: Option<String>,
    /// Admit only entries newer than this duration (e.g. `24h`).
    pub newer_than: Option<String>,
    /// Size filter (e.g. `+100M`, `-1G`).
    pub size: Option<String>,
    /// Include globs.
    pub include: Vec<String>,
    /// Exclude globs.
    pub exclude: Vec<String>,
    /// Regular expression.
    pub regex: Option<String>,
    /// Suppress hidden entries.
    pub skip_hidden: bool,
}

impl FilterSpec {
    /// Compile into criteria, resolving durations relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns the first [`FilterError`] encountered.
    pub fn compile(&self, now: SystemTime) -> Result<FilterCriteria, FilterError> {
        let cutoff = |value: &Option<String>| -> Result<Option<SystemTime>, FilterError> {
            value
                .as_deref()
                .map(|v| {
                    let age = parse::parse_duration(v)?;
                    Ok(now.checked_sub(age).unwrap_or(SystemTime::UNIX_EPOCH))
                })
                .transpose()
        };

        let size = self
            .size
            .as_deref()
            .map(parse::parse_size_filter)
            .transpose()?;

        let regex = self
            .regex
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| FilterError::InvalidRegex {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;

        let criteria = FilterCriteria::new()
            .with_skip_hidden(self.skip_hidden)
            .with_older_than(cutoff(&self.older_than)?)
            .with_newer_than(cutoff(&self.newer_than)?)
            .with_size(size)
            .with_regex(regex)
            .with_include(self.include.clone())?
            .with_exclude(self.exclude.clone())?;

        log::debug!("Compiled filter criteria: {:?}", criteria);
        Ok(criteria)
    }
}
