use chrono::NaiveDate;
use release_plan::cli::orchestration::{
    load_commit_file, run_plan_with_source, run_plan_workflow, write_manifest, CommitFeed,
    PlanWorkflowArgs,
};
use release_plan::git::MockCommitSource;
use release_plan::manifest::Manifest;
use release_plan::warnings::PlanWarning;
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Workflow args over the fixture config and feed, with the manifest copied
/// into a scratch directory so it can be rewritten
fn workflow_args(dir: &TempDir, with_manifest: bool) -> PlanWorkflowArgs {
    let manifest_path = dir.path().join(".release-please-manifest.json");
    if with_manifest {
        fs::copy(fixture("manifest.json"), &manifest_path).unwrap();
    }

    PlanWorkflowArgs {
        config_path: Some(fixture("monorepo.json")),
        manifest_path,
        feed: CommitFeed::File(fixture("commits.json")),
        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
    }
}

#[test]
fn test_plan_workflow_from_files() {
    let dir = TempDir::new().unwrap();
    let result = run_plan_workflow(&workflow_args(&dir, true)).unwrap();
    let plan = &result.plan;

    let paths: Vec<&str> = plan.candidates.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["packages/cli", "packages/core"]);

    let core = &plan.candidates["packages/core"];
    assert_eq!(core.previous_version, Some(Version::new(1, 4, 2)));
    assert_eq!(core.new_version, Version::new(1, 5, 0));
    assert_eq!(core.tag, "core-v1.5.0");
    assert_eq!(core.bump.reason, "1 feature, 1 fix");
    assert_eq!(
        core.changelog_entry,
        "## [1.5.0](https://github.com/acme/widgets/compare/core-v1.4.2...core-v1.5.0) (2024-05-01)\n\
         \n\
         \n\
         ### Features\n\
         \n\
         * **core:** add streaming parser ([c3c3c3c](https://github.com/acme/widgets/commit/c3c3c3c3c3c3c3c3)), closes [#12](https://github.com/acme/widgets/issues/12)\n\
         \n\
         \n\
         ### Bug Fixes\n\
         \n\
         * **core:** handle empty input ([b2b2b2b](https://github.com/acme/widgets/commit/b2b2b2b2b2b2b2b2))"
    );
    let updates: Vec<&str> = core.updates.iter().map(|u| u.path.as_str()).collect();
    assert_eq!(
        updates,
        vec!["packages/core/CHANGELOG.md", "packages/core/Cargo.toml"]
    );

    let cli = &plan.candidates["packages/cli"];
    assert_eq!(cli.new_version, Version::new(0, 9, 1));
    assert!(!cli.touched_directly);
    assert_eq!(
        cli.changelog_entry,
        "## [0.9.1](https://github.com/acme/widgets/compare/cli-v0.9.0...cli-v0.9.1) (2024-05-01)\n\
         \n\
         \n\
         ### Dependencies\n\
         \n\
         * The following workspace dependencies were updated\n  \
         * dependencies\n    \
         * core bumped from 1.4.2 to 1.5.0"
    );

    assert_eq!(
        plan.warnings,
        vec![PlanWarning::CascadeSkipped {
            component: "packages/web".to_string(),
            dependency: "packages/core".to_string(),
        }]
    );
}

#[test]
fn test_first_release_without_manifest() {
    let dir = TempDir::new().unwrap();
    let result = run_plan_workflow(&workflow_args(&dir, false)).unwrap();
    assert!(result.manifest.is_empty());

    let core = &result.plan.candidates["packages/core"];
    assert_eq!(core.previous_version, None);
    assert_eq!(core.new_version, Version::new(1, 0, 0));

    let cli = &result.plan.candidates["packages/cli"];
    assert_eq!(cli.new_version, Version::new(1, 0, 0));
    assert_eq!(cli.dependency_notes[0].to_string(), "core bumped to 1.0.0");
    assert!(cli.changelog_entry.starts_with("## 1.0.0 (2024-05-01)"));

    // docs commits are hidden, so the docs component stays unreleased
    assert!(!result.plan.candidates.contains_key("docs"));
}

#[test]
fn test_write_manifest_records_candidates() {
    let dir = TempDir::new().unwrap();
    let args = workflow_args(&dir, true);
    let result = run_plan_workflow(&args).unwrap();

    let written = write_manifest(&result, &args.manifest_path).unwrap();
    let reloaded = Manifest::load(&args.manifest_path).unwrap();
    assert_eq!(written, reloaded);
    assert_eq!(reloaded.get("packages/core"), Some(&Version::new(1, 5, 0)));
    assert_eq!(reloaded.get("packages/cli"), Some(&Version::new(0, 9, 1)));
    assert_eq!(reloaded.get("packages/web"), Some(&Version::new(2, 0, 0)));
    assert_eq!(reloaded.get("docs"), Some(&Version::new(1, 0, 0)));

    // the next run starts from the recorded versions
    let rerun = run_plan_workflow(&args).unwrap();
    assert_eq!(
        rerun.plan.candidates["packages/core"].previous_version,
        Some(Version::new(1, 5, 0))
    );
}

#[test]
fn test_plan_with_source_respects_since() {
    let dir = TempDir::new().unwrap();
    let args = workflow_args(&dir, true);
    let source = MockCommitSource::new(load_commit_file(&fixture("commits.json")).unwrap());

    let result = run_plan_with_source(&args, &source, Some("b2b2b2b")).unwrap();
    let core = &result.plan.candidates["packages/core"];
    assert_eq!(core.new_version, Version::new(1, 5, 0));
    assert_eq!(core.bump.reason, "1 feature");
    assert!(!core.changelog_entry.contains("handle empty input"));
}

#[test]
fn test_plan_with_source_unknown_revision() {
    let dir = TempDir::new().unwrap();
    let args = workflow_args(&dir, true);
    let source = MockCommitSource::default();

    assert!(run_plan_with_source(&args, &source, Some("deadbeef")).is_err());
}

#[test]
fn test_invalid_commit_feed_names_the_file() {
    let dir = TempDir::new().unwrap();
    let feed = dir.path().join("commits.json");
    fs::write(&feed, r#"{"sha": "not a list"}"#).unwrap();

    let mut args = workflow_args(&dir, true);
    args.feed = CommitFeed::File(feed);

    let err = run_plan_workflow(&args).unwrap_err();
    assert!(
        err.to_string().contains("commits.json"),
        "unexpected error: {:#}",
        err
    );
}

#[test]
fn test_plan_from_repository_feed() {
    let dir = TempDir::new().unwrap();
    let mut args = workflow_args(&dir, true);
    args.feed = CommitFeed::Repository {
        path: dir.path().join("not-a-repo"),
        since: None,
    };

    let err = run_plan_workflow(&args).unwrap_err();
    assert!(err.to_string().contains("Cannot open repository"));
}
