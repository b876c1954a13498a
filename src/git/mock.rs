use crate::domain::RawCommit;
use crate::error::{ReleasePlanError, Result};
use crate::git::CommitSource;

/// In-memory commit feed for testing without a repository
#[derive(Debug, Clone, Default)]
pub struct MockCommitSource {
    /// Most recent first
    commits: Vec<RawCommit>,
}

impl MockCommitSource {
    pub fn new(commits: Vec<RawCommit>) -> Self {
        MockCommitSource { commits }
    }

    /// Add a commit as the newest one
    pub fn push(&mut self, commit: RawCommit) {
        self.commits.insert(0, commit);
    }
}

impl CommitSource for MockCommitSource {
    fn commits_since(&self, since: Option<&str>) -> Result<Vec<RawCommit>> {
        let Some(since) = since else {
            return Ok(self.commits.clone());
        };

        let end = self
            .commits
            .iter()
            .position(|commit| commit.sha == since || commit.sha.starts_with(since))
            .ok_or_else(|| {
                ReleasePlanError::config(format!("Cannot resolve revision '{}'", since))
            })?;
        Ok(self.commits[..end].to_vec())
    }
}
