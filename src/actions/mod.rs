//! Deletion actions.
//!
//! This module provides functionality for:
//! - Soft deletion into a recoverable trash store
//! - Secure erasure (three overwrite passes, then unlink)
//! - Bounded-concurrency batch processing with per-item outcome reporting
//!
//! ```no_run
//! use nuke::actions::{DeleteEngine, Disposition, NoProgress};
//! use nuke::scanner::CandidateEntry;
//! use std::path::Path;
//!
//! let entry = CandidateEntry::from_path(Path::new("old.log")).unwrap();
//! let result = DeleteEngine::new(Disposition::SecureErase).apply(&[entry], &NoProgress);
//! println!("{}", result.summary());
//! ```

pub mod delete;
pub mod shred;

// Re-export commonly used types
pub use delete::{
    BatchDeleteResult, DeleteEngine, DeleteError, DeleteProgressCallback, DeleteResult,
    Disposition, NoProgress, DEFAULT_WORKERS,
};

pub use shred::{overwrite_passes, shred_file, ShredTarget, SHRED_CHUNK_SIZE, SHRED_PASSES};
