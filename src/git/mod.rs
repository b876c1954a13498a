//! Commit feed abstraction layer
//!
//! The engine never talks to git itself; it receives a ready list of
//! [`RawCommit`]s. This module provides the [`CommitSource`] trait that
//! produces that list, with two implementations:
//!
//! - [repository::Git2CommitSource]: walks a local repository with `git2`
//! - [mock::MockCommitSource]: an in-memory feed for tests
//!
//! ```rust
//! # use release_plan::git::{CommitSource, MockCommitSource};
//! # use release_plan::domain::RawCommit;
//! let source = MockCommitSource::new(vec![
//!     RawCommit::new("b2", "feat: newer", vec!["src/lib.rs"]),
//!     RawCommit::new("a1", "fix: older", vec!["src/lib.rs"]),
//! ]);
//! let commits = source.commits_since(Some("a1")).unwrap();
//! assert_eq!(commits.len(), 1);
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockCommitSource;
pub use repository::Git2CommitSource;

use crate::domain::RawCommit;
use crate::error::Result;

/// Supplies the commit feed for a planning run
///
/// ## Ordering
///
/// Commits are returned most recent first, each with its full changed-file list.
pub trait CommitSource: Send + Sync {
    /// Commits reachable from HEAD that are not reachable from `since`.
    ///
    /// # Arguments
    /// * `since` - Revision of the last release (tag name, branch or sha);
    ///   `None` returns the whole history
    ///
    /// # Returns
    /// * `Ok(Vec<RawCommit>)` - Commits in most-recent-first order
    /// * `Err` - If `since` cannot be resolved or the history cannot be read
    fn commits_since(&self, since: Option<&str>) -> Result<Vec<RawCommit>>;
}
