//! nuke - a safer file-deletion engine
//!
//! Instead of unlinking targets immediately, candidates chosen by a
//! [`filter::FilterCriteria`] are found by a [`scanner::Walker`] and handed
//! to an [`actions::DeleteEngine`], which either stages them into a
//! recoverable [`trash::TrashStore`] or securely erases them, with bounded
//! parallelism and per-item error isolation.

pub mod actions;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod scanner;
pub mod trash;
