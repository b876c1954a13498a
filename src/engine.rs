//! The release planning pipeline.
//!
//! parse → split → resolve (per component) → cascade → manifest diff → render.
//! Every stage receives the run's span explicitly; the engine holds no state
//! between runs, so equal inputs produce equal plans.

use crate::analyzer::VersionAnalyzer;
use crate::changelog::{BuildNotesOptions, ChangelogNotes, DefaultChangelogNotes};
use crate::config::Config;
use crate::domain::commit::parse_conventional_commits;
use crate::domain::{Component, ConventionalCommit, FileUpdate, RawCommit, VersionBump};
use crate::error::Result;
use crate::graph::{DependencyGraph, DependencyNote, PlannedRelease};
use crate::manifest::{Manifest, ReleasedVersion};
use crate::split::CommitSplit;
use crate::warnings::PlanWarning;
use chrono::NaiveDate;
use semver::Version;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, info_span, warn};

/// Proposed release for one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseCandidate {
    pub path: String,
    pub name: String,
    pub previous_version: Option<Version>,
    pub new_version: Version,
    pub bump: VersionBump,
    pub touched_directly: bool,
    pub tag: String,
    pub changelog_entry: String,
    pub dependency_notes: Vec<DependencyNote>,
    /// Files the external updater must rewrite
    pub updates: Vec<FileUpdate>,
}

impl ReleasedVersion for ReleaseCandidate {
    fn released_version(&self) -> &Version {
        &self.new_version
    }
}

impl ReleasedVersion for PlannedRelease {
    fn released_version(&self) -> &Version {
        &self.new_version
    }
}

/// Result of one planning run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
    pub candidates: BTreeMap<String, ReleaseCandidate>,
    pub warnings: Vec<PlanWarning>,
}

impl ReleasePlan {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

pub struct ReleaseEngine {
    config: Config,
    components: Vec<Component>,
    notes: Box<dyn ChangelogNotes>,
}

impl ReleaseEngine {
    pub fn new(config: Config, components: Vec<Component>) -> Self {
        ReleaseEngine {
            config,
            components,
            notes: Box::new(DefaultChangelogNotes),
        }
    }

    /// Engine over the components described by `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let components = config.components()?;
        Ok(Self::new(config, components))
    }

    /// Replace the changelog renderer
    pub fn with_notes(mut self, notes: impl ChangelogNotes + 'static) -> Self {
        self.notes = Box::new(notes);
        self
    }

    pub fn plan(&self, commits: &[RawCommit], manifest: &Manifest, date: NaiveDate) -> Result<ReleasePlan> {
        let span = info_span!("release_plan", %date, commits = commits.len());
        let mut warnings = Vec::new();

        let components: Vec<Component> = self
            .components
            .iter()
            .cloned()
            .map(|mut component| {
                if let Some(version) = manifest.get(&component.path) {
                    component.current_version = Some(version.clone());
                }
                component
            })
            .collect();
        let paths: Vec<String> = components.iter().map(|c| c.path.clone()).collect();
        let graph = DependencyGraph::build(components, span.clone())?;

        let parsed = parse_conventional_commits(commits, &span);
        let splitter = CommitSplit::new(&paths, self.config.include_empty_commits, span.clone());
        let assignment = splitter.assign(&parsed)?;
        warnings.extend(
            assignment
                .unassigned
                .iter()
                .map(|sha| PlanWarning::UnassignedCommit { sha: sha.clone() }),
        );
        let split = assignment.by_path;

        let analyzer = VersionAnalyzer::new(self.config.changelog_sections.clone(), span.clone());
        let mut direct = BTreeMap::new();
        for component in graph.components() {
            let assigned = split.get(&component.path).map_or(&[][..], Vec::as_slice);
            let bump = analyzer.resolve(
                &component.path,
                assigned,
                component.current_version.as_ref(),
                &component.policy,
            )?;

            if let (Some(target), Some(previous)) = (bump.target(), &component.current_version) {
                if target < previous {
                    warn!(parent: &span, component = %component.path, %target, %previous, "release-as moves version backwards");
                    warnings.push(PlanWarning::NonMonotonicVersion {
                        component: component.path.clone(),
                        previous: previous.clone(),
                        target: target.clone(),
                    });
                }
            }
            direct.insert(component.path.clone(), bump);
        }

        let outcome = graph.walk(&direct)?;
        warnings.extend(outcome.skipped.iter().map(|skipped| PlanWarning::CascadeSkipped {
            component: skipped.path.clone(),
            dependency: skipped.dependency.clone(),
        }));

        let releasing = manifest.diff(&outcome.releases);
        for (path, release) in &outcome.releases {
            if !releasing.contains_key(path) {
                warnings.push(PlanWarning::AlreadyReleased {
                    component: path.clone(),
                    version: release.new_version.clone(),
                });
            }
        }

        let mut candidates = BTreeMap::new();
        for (path, release) in releasing {
            let Some(component) = graph.component(&path) else {
                continue;
            };
            let assigned = split.get(&path).map_or(&[][..], Vec::as_slice);
            let candidate = self.render(component, release, assigned, date);
            candidates.insert(path, candidate);
        }

        info!(parent: &span, candidates = candidates.len(), warnings = warnings.len(), "release plan computed");
        Ok(ReleasePlan {
            candidates,
            warnings,
        })
    }

    fn render(
        &self,
        component: &Component,
        release: PlannedRelease,
        commits: &[ConventionalCommit],
        date: NaiveDate,
    ) -> ReleaseCandidate {
        let tag_format = self.config.tag_format(component);
        let current_tag = tag_format.format(&release.new_version);

        let options = BuildNotesOptions {
            version: release.new_version.clone(),
            previous_tag: release.previous_version.as_ref().map(|v| tag_format.format(v)),
            current_tag: current_tag.clone(),
            date,
            repository: self.config.repository.link(),
            sections: self.config.changelog_sections.clone(),
            dependency_notes: release.dependency_notes.clone(),
        };
        let changelog_entry = self.notes.build_notes(commits, &options);

        ReleaseCandidate {
            path: release.path,
            name: release.name,
            previous_version: release.previous_version,
            new_version: release.new_version,
            bump: release.bump,
            touched_directly: release.touched_directly,
            tag: current_tag.name,
            changelog_entry,
            dependency_notes: release.dependency_notes,
            updates: component.build_updates(),
        }
    }
}
