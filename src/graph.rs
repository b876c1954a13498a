//! Dependency graph over components and the cascade of version bumps.
//!
//! Components live in an arena keyed by path; edges are stored as path lists on
//! each component. The walk visits dependencies before dependents, so one pass
//! reaches the same result as repeatedly cascading until nothing changes.

use crate::domain::version::bump_version;
use crate::domain::{BumpLevel, CascadePolicy, Component, VersionBump};
use crate::error::{ReleasePlanError, Result};
use semver::Version;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, Span};

/// Synthesized changelog note for a dependency updated in the same run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNote {
    pub path: String,
    pub name: String,
    pub previous_version: Option<Version>,
    pub new_version: Version,
}

impl fmt::Display for DependencyNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.previous_version {
            Some(previous) => write!(
                f,
                "{} bumped from {} to {}",
                self.name, previous, self.new_version
            ),
            None => write!(f, "{} bumped to {}", self.name, self.new_version),
        }
    }
}

/// A component that will release this run, before changelog rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRelease {
    pub path: String,
    pub name: String,
    pub previous_version: Option<Version>,
    pub new_version: Version,
    pub bump: VersionBump,
    pub touched_directly: bool,
    pub dependency_notes: Vec<DependencyNote>,
}

/// A component whose dependency was bumped but which does not cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCascade {
    pub path: String,
    pub dependency: String,
}

/// Output of one walk over the graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub releases: BTreeMap<String, PlannedRelease>,
    pub skipped: Vec<SkippedCascade>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

pub struct DependencyGraph {
    components: BTreeMap<String, Component>,
    span: Span,
}

impl DependencyGraph {
    /// Build and validate the graph.
    ///
    /// Fails when a dependency names an unknown component or when the
    /// dependency relation contains a cycle.
    pub fn build(components: Vec<Component>, span: Span) -> Result<Self> {
        let components: BTreeMap<String, Component> = components
            .into_iter()
            .map(|component| (component.path.clone(), component))
            .collect();

        for component in components.values() {
            for dependency in &component.dependencies {
                if !components.contains_key(dependency) {
                    return Err(ReleasePlanError::UnknownDependency {
                        component: component.path.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let graph = DependencyGraph { components, span };
        graph.check_acyclic()?;
        Ok(graph)
    }

    pub fn component(&self, path: &str) -> Option<&Component> {
        self.components.get(path)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    fn check_acyclic(&self) -> Result<()> {
        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        let mut stack: Vec<String> = Vec::new();

        for path in self.components.keys() {
            self.visit(path, &mut marks, &mut stack)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        path: &'a str,
        marks: &mut BTreeMap<&'a str, Mark>,
        stack: &mut Vec<String>,
    ) -> Result<()> {
        match marks.get(path) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|p| p == path).unwrap_or(0);
                return Err(ReleasePlanError::cycle(&stack[start..], path));
            }
            None => {}
        }

        marks.insert(path, Mark::Visiting);
        stack.push(path.to_string());

        if let Some(component) = self.components.get(path) {
            let dependencies: BTreeSet<&str> =
                component.dependencies.iter().map(String::as_str).collect();
            for dependency in dependencies {
                self.visit(dependency, marks, stack)?;
            }
        }

        stack.pop();
        marks.insert(path, Mark::Done);
        Ok(())
    }

    /// Topological order, dependencies first, ties broken by path
    pub fn order(&self) -> Vec<&str> {
        let mut remaining: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for (path, component) in &self.components {
            let dependencies: BTreeSet<&str> =
                component.dependencies.iter().map(String::as_str).collect();
            remaining.insert(path.as_str(), dependencies.len());
            for dependency in dependencies {
                dependents.entry(dependency).or_default().push(path.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(path, _)| *path)
            .collect();
        let mut order = Vec::with_capacity(self.components.len());

        while let Some(path) = ready.pop_first() {
            order.push(path);
            for dependent in dependents.get(path).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        order
    }

    /// Cascade direct bumps through the graph.
    ///
    /// Only components that release this run appear in the result.
    pub fn cascade(&self, direct: &BTreeMap<String, VersionBump>) -> Result<BTreeMap<String, PlannedRelease>> {
        Ok(self.walk(direct)?.releases)
    }

    /// Like [`cascade`](Self::cascade), also reporting dependents that declined to cascade
    pub fn walk(&self, direct: &BTreeMap<String, VersionBump>) -> Result<CascadeOutcome> {
        if let Some(unknown) = direct.keys().find(|path| !self.components.contains_key(*path)) {
            return Err(ReleasePlanError::config(format!(
                "version bump computed for unconfigured component '{}'",
                unknown
            )));
        }

        let mut outcome = CascadeOutcome::default();

        for path in self.order() {
            let Some(component) = self.components.get(path) else {
                continue;
            };

            let notes = self.dependency_notes(component, &outcome.releases);
            let direct_bump = direct.get(path).filter(|bump| bump.is_release());

            let (bump, touched_directly) = match direct_bump {
                Some(bump) => (bump.clone(), true),
                None if notes.is_empty() => continue,
                None => {
                    if component.cascade_policy() == CascadePolicy::Skip {
                        debug!(parent: &self.span, component = path, "dependency cascade disabled");
                        outcome.skipped.extend(notes.iter().map(|note| SkippedCascade {
                            path: path.to_string(),
                            dependency: note.path.clone(),
                        }));
                        continue;
                    }
                    (
                        VersionBump::new(BumpLevel::Patch, "dependency update"),
                        false,
                    )
                }
            };

            let new_version = next_version(component, &bump.level);
            debug!(
                parent: &self.span,
                component = path,
                version = %new_version,
                touched_directly,
                "planned release"
            );

            outcome.releases.insert(
                path.to_string(),
                PlannedRelease {
                    path: path.to_string(),
                    name: component.name.clone(),
                    previous_version: component.current_version.clone(),
                    new_version,
                    bump,
                    touched_directly,
                    dependency_notes: notes,
                },
            );
        }

        Ok(outcome)
    }

    /// One note per direct dependency released this run, ordered by path
    fn dependency_notes(
        &self,
        component: &Component,
        releases: &BTreeMap<String, PlannedRelease>,
    ) -> Vec<DependencyNote> {
        let dependencies: BTreeSet<&str> =
            component.dependencies.iter().map(String::as_str).collect();

        dependencies
            .into_iter()
            .filter_map(|dependency| releases.get(dependency))
            .map(|release| DependencyNote {
                path: release.path.clone(),
                name: release.name.clone(),
                previous_version: release.previous_version.clone(),
                new_version: release.new_version.clone(),
            })
            .collect()
    }
}

/// New version for a component, falling back to its initial version on first release
pub fn next_version(component: &Component, level: &BumpLevel) -> Version {
    match (level, &component.current_version) {
        (BumpLevel::Exact(target), _) => target.clone(),
        (level, Some(current)) => bump_version(current, level),
        (_, None) => component.policy.initial_version(),
    }
}
