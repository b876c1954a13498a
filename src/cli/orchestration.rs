//! Main workflow orchestration logic
//!
//! Glue between the command line and the library: load configuration and
//! manifest, fetch the commit feed, run the engine. Kept free of clap so the
//! workflow can be driven programmatically.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::load_config;
use crate::domain::RawCommit;
use crate::engine::{ReleaseEngine, ReleasePlan};
use crate::git::{CommitSource, Git2CommitSource};
use crate::manifest::Manifest;

/// Where the commit feed comes from
#[derive(Debug, Clone, PartialEq)]
pub enum CommitFeed {
    /// JSON array of raw commits
    File(PathBuf),
    /// Walk a local repository from HEAD back to `since`
    Repository { path: PathBuf, since: Option<String> },
}

/// Arguments for the plan workflow
#[derive(Debug, Clone, PartialEq)]
pub struct PlanWorkflowArgs {
    /// Path to custom config file
    pub config_path: Option<PathBuf>,

    pub manifest_path: PathBuf,

    pub feed: CommitFeed,

    /// Release date written into changelog headers
    pub date: NaiveDate,
}

/// Result of a successful plan workflow
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    pub plan: ReleasePlan,
    /// The manifest as loaded, before any release is applied
    pub manifest: Manifest,
}

/// Read a JSON commit feed, most recent first
pub fn load_commit_file(path: &Path) -> Result<Vec<RawCommit>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read commit feed '{}'", path.display()))?;
    let commits = serde_json::from_str(&content)
        .with_context(|| format!("Invalid commit feed '{}'", path.display()))?;
    Ok(commits)
}

fn load_commits(feed: &CommitFeed) -> Result<Vec<RawCommit>> {
    match feed {
        CommitFeed::File(path) => load_commit_file(path),
        CommitFeed::Repository { path, since } => {
            let source = Git2CommitSource::open(path)
                .with_context(|| format!("Cannot open repository at '{}'", path.display()))?;
            Ok(source.commits_since(since.as_deref())?)
        }
    }
}

/// Plan workflow
///
/// 1. Fetch the commit feed
/// 2. Load configuration and build components
/// 3. Load the manifest (missing file = first release everywhere)
/// 4. Run the engine
pub fn run_plan_workflow(args: &PlanWorkflowArgs) -> Result<WorkflowResult> {
    let commits = load_commits(&args.feed)?;
    plan_commits(args, &commits)
}

/// Plan against commits from any source, ignoring `args.feed`
pub fn run_plan_with_source<S: CommitSource>(
    args: &PlanWorkflowArgs,
    source: &S,
    since: Option<&str>,
) -> Result<WorkflowResult> {
    let commits = source.commits_since(since)?;
    plan_commits(args, &commits)
}

fn plan_commits(args: &PlanWorkflowArgs, commits: &[RawCommit]) -> Result<WorkflowResult> {
    let config = load_config(args.config_path.as_deref()).context("Error loading config")?;
    let manifest = Manifest::load(&args.manifest_path)?;

    let engine = ReleaseEngine::from_config(config)?;
    let plan = engine.plan(commits, &manifest, args.date)?;
    Ok(WorkflowResult { plan, manifest })
}

/// Record the planned versions in the manifest file once releases are confirmed
pub fn write_manifest(result: &WorkflowResult, path: &Path) -> Result<Manifest> {
    let mut manifest = result.manifest.clone();
    manifest.apply(&result.plan.candidates);
    manifest
        .save(path)
        .with_context(|| format!("Cannot write manifest '{}'", path.display()))?;
    Ok(manifest)
}
