use crate::changelog::ChangelogSection;
use crate::domain::version::parse_version;
use crate::domain::{BumpLevel, ConventionalCommit, ReleasePolicy, VersionBump};
use crate::error::{ReleasePlanError, Result};
use semver::Version;
use tracing::{debug, Span};

/// Decides the version bump for one component from its own commits
pub struct VersionAnalyzer {
    sections: Vec<ChangelogSection>,
    span: Span,
}

/// Counts of the commit categories that drive a bump, used for the reason string
#[derive(Debug, Default)]
struct CommitTally {
    breaking: usize,
    features: usize,
    fixes: usize,
    other: usize,
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

impl CommitTally {
    fn reason(&self) -> String {
        let mut parts = Vec::new();
        if self.breaking > 0 {
            parts.push(plural(self.breaking, "breaking change", "breaking changes"));
        }
        if self.features > 0 {
            parts.push(plural(self.features, "feature", "features"));
        }
        if self.fixes > 0 {
            parts.push(plural(self.fixes, "fix", "fixes"));
        }
        if self.other > 0 {
            parts.push(plural(self.other, "other change", "other changes"));
        }
        parts.join(", ")
    }
}

impl VersionAnalyzer {
    pub fn new(sections: Vec<ChangelogSection>, span: Span) -> Self {
        VersionAnalyzer { sections, span }
    }

    fn is_feature(commit: &ConventionalCommit) -> bool {
        matches!(commit.r#type.as_str(), "feat" | "feature")
    }

    /// Types that are rendered in the changelog
    fn is_visible(&self, commit_type: &str) -> bool {
        self.sections
            .iter()
            .any(|section| section.r#type == commit_type && !section.hidden)
    }

    fn tally(&self, commits: &[ConventionalCommit]) -> CommitTally {
        let mut tally = CommitTally::default();
        for commit in commits {
            if commit.breaking {
                tally.breaking += 1;
            } else if Self::is_feature(commit) {
                tally.features += 1;
            } else if commit.r#type == "fix" {
                tally.fixes += 1;
            } else if self.is_visible(&commit.r#type) {
                tally.other += 1;
            }
        }
        tally
    }

    /// Resolve the bump for `component` from the commits assigned to it.
    ///
    /// `current` is `None` before the first release. Precedence: configured
    /// release-as, a commit `Release-As` footer, breaking changes, features,
    /// then any other visible type. No qualifying commits gives `BumpLevel::None`.
    pub fn resolve(
        &self,
        component: &str,
        commits: &[ConventionalCommit],
        current: Option<&Version>,
        policy: &ReleasePolicy,
    ) -> Result<VersionBump> {
        let bump = self.decide(component, commits, current, policy)?;
        debug!(
            parent: &self.span,
            component,
            commits = commits.len(),
            level = %bump.level,
            reason = %bump.reason,
            "resolved version bump"
        );
        Ok(bump)
    }

    fn decide(
        &self,
        component: &str,
        commits: &[ConventionalCommit],
        current: Option<&Version>,
        policy: &ReleasePolicy,
    ) -> Result<VersionBump> {
        if commits.is_empty() {
            return Ok(VersionBump::none("no commits"));
        }

        if let Some(target) = &policy.release_as {
            return Ok(VersionBump::new(
                BumpLevel::Exact(target.clone()),
                "release-as override (configuration)",
            ));
        }

        if let Some(raw) = commits.iter().find_map(|commit| commit.release_as()) {
            let target = parse_version(raw)
                .map_err(|_| ReleasePlanError::invalid_release_as(component, raw))?;
            return Ok(VersionBump::new(BumpLevel::Exact(target), "release-as override"));
        }

        let tally = self.tally(commits);
        let pre_major = current.is_some_and(|version| version.major == 0);

        let level = if tally.breaking > 0 {
            if pre_major && policy.bump_minor_pre_major {
                BumpLevel::Minor
            } else if pre_major && policy.bump_patch_for_minor_pre_major {
                BumpLevel::Patch
            } else {
                BumpLevel::Major
            }
        } else if tally.features > 0 {
            if pre_major && policy.bump_patch_for_minor_pre_major {
                BumpLevel::Patch
            } else {
                BumpLevel::Minor
            }
        } else if tally.fixes > 0 || tally.other > 0 {
            BumpLevel::Patch
        } else {
            return Ok(VersionBump::none("no releasable commits"));
        };

        Ok(VersionBump::new(level, tally.reason()))
    }
}
