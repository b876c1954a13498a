use crate::domain::RawCommit;
use crate::error::{ReleasePlanError, Result};
use git2::{Commit, Repository as Git2Repo, Sort};
use std::path::Path;
use std::sync::Mutex;

/// Commit source backed by a local git repository
pub struct Git2CommitSource {
    repo: Mutex<Git2Repo>,
}

impl Git2CommitSource {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        Ok(Self::from_git2(repo))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2CommitSource {
            repo: Mutex::new(repo),
        }
    }
}

/// Paths changed by `commit` relative to its first parent (or the empty tree)
fn changed_files(repo: &Git2Repo, commit: &Commit<'_>) -> Result<Vec<String>> {
    let tree = commit.tree()?;
    let parent_tree = match commit.parent_count() {
        0 => None,
        _ => Some(commit.parent(0)?.tree()?),
    };

    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
    let mut files = Vec::new();
    for delta in diff.deltas() {
        let path = delta.new_file().path().or_else(|| delta.old_file().path());
        if let Some(path) = path.and_then(|p| p.to_str()) {
            files.push(path.to_string());
        }
    }
    Ok(files)
}

impl super::CommitSource for Git2CommitSource {
    fn commits_since(&self, since: Option<&str>) -> Result<Vec<RawCommit>> {
        let repo = self
            .repo
            .lock()
            .map_err(|_| ReleasePlanError::config("repository handle is poisoned"))?;

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push_head()?;

        if let Some(since) = since {
            let object = repo.revparse_single(since).map_err(|e| {
                ReleasePlanError::config(format!("Cannot resolve revision '{}': {}", since, e))
            })?;
            revwalk.hide(object.peel_to_commit()?.id())?;
        }

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = repo.find_commit(oid)?;
            let message = String::from_utf8_lossy(commit.message_bytes()).into_owned();
            let files = changed_files(&repo, &commit)?;

            commits.push(RawCommit::new(oid.to_string(), message, files));
        }

        Ok(commits)
    }
}
