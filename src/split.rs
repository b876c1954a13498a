//! Commit splitting: assign each commit to the components whose files it changed.
//!
//! Non-root components claim a commit when one of its files lies under their
//! path (longest prefix wins per file). A root component (`.`) receives every
//! commit of the feed.

use crate::domain::component::{normalize_path, ROOT_PATH};
use crate::domain::ConventionalCommit;
use crate::error::{ReleasePlanError, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, Span};

/// Partitions commits by component path using longest-prefix matching
pub struct CommitSplit {
    /// Normalised non-root component paths, longest first
    paths: Vec<String>,
    root: bool,
    include_empty: bool,
    span: Span,
}

/// Outcome of one pass over the commit feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitAssignment {
    /// Commits per component path in feed order; components without commits are absent
    pub by_path: BTreeMap<String, Vec<ConventionalCommit>>,
    /// Shas of commits no component claimed, each listed once
    pub unassigned: Vec<String>,
}

impl CommitSplit {
    pub fn new<S: AsRef<str>>(paths: &[S], include_empty: bool, span: Span) -> Self {
        let mut paths: Vec<String> = paths.iter().map(|p| normalize_path(p.as_ref())).collect();
        paths.sort();
        paths.dedup();

        let root = paths.iter().any(|p| p == ROOT_PATH);
        paths.retain(|p| p != ROOT_PATH);
        paths.sort_by_key(|p| std::cmp::Reverse(p.len()));

        CommitSplit {
            paths,
            root,
            include_empty,
            span,
        }
    }

    /// Non-root component path owning `file`, if any
    pub fn owner(&self, file: &str) -> Option<&str> {
        let file = file.strip_prefix("./").unwrap_or(file);
        self.paths
            .iter()
            .find(|path| {
                file == path.as_str()
                    || file
                        .strip_prefix(path.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .map(String::as_str)
    }

    /// Component paths a commit belongs to, each listed once, longest path first
    /// and the root last
    pub fn components_for(&self, commit: &ConventionalCommit) -> Result<Vec<&str>> {
        let files = commit
            .files
            .as_ref()
            .ok_or_else(|| ReleasePlanError::MissingFiles {
                sha: commit.sha.clone(),
            })?;

        let mut owners: Vec<&str> = Vec::new();
        if files.is_empty() {
            if self.include_empty {
                owners.extend(self.paths.iter().map(String::as_str));
            }
        } else {
            for file in files {
                if let Some(owner) = self.owner(file) {
                    if !owners.contains(&owner) {
                        owners.push(owner);
                    }
                }
            }
        }

        if self.root {
            owners.push(ROOT_PATH);
        }
        Ok(owners)
    }

    /// Split commits per component and collect the ones nobody claimed.
    ///
    /// Feed order is preserved within each component's list.
    pub fn assign(&self, commits: &[ConventionalCommit]) -> Result<CommitAssignment> {
        let mut assignment = CommitAssignment::default();
        let mut seen = BTreeSet::new();

        for commit in commits {
            let owners = self.components_for(commit)?;
            if owners.is_empty() {
                debug!(parent: &self.span, sha = %commit.sha, "commit touches no configured component");
                if seen.insert(commit.sha.as_str()) {
                    assignment.unassigned.push(commit.sha.clone());
                }
                continue;
            }
            for owner in owners {
                assignment
                    .by_path
                    .entry(owner.to_string())
                    .or_default()
                    .push(commit.clone());
            }
        }

        Ok(assignment)
    }

    /// Per-component commit lists only; see [`assign`](Self::assign)
    pub fn split(&self, commits: &[ConventionalCommit]) -> Result<BTreeMap<String, Vec<ConventionalCommit>>> {
        Ok(self.assign(commits)?.by_path)
    }
}
