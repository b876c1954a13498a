use semver::Version;
use serde::{Deserialize, Serialize};

/// Path of a component that lives at the repository root
pub const ROOT_PATH: &str = ".";

/// Canonical form of a component path: no `./` prefix, no trailing slash, root as `.`
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    if trimmed.is_empty() {
        ROOT_PATH.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Release type of a component, selected when configuration is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentStrategy {
    #[default]
    Simple,
    Rust,
    Node,
    Python,
    Go,
    Helm,
}

/// What happens to a component whose dependency was bumped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadePolicy {
    PatchBump,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateKind {
    Changelog,
    VersionManifest,
    ExtraFile,
}

/// A file the external updater must rewrite for a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileUpdate {
    pub path: String,
    pub kind: UpdateKind,
}

impl ComponentStrategy {
    /// The file that records the version for this release type, relative to the component
    pub fn version_file(&self) -> Option<&'static str> {
        match self {
            ComponentStrategy::Simple => Some("version.txt"),
            ComponentStrategy::Rust => Some("Cargo.toml"),
            ComponentStrategy::Node => Some("package.json"),
            ComponentStrategy::Python => Some("pyproject.toml"),
            ComponentStrategy::Helm => Some("Chart.yaml"),
            // Go modules are versioned by tags only
            ComponentStrategy::Go => None,
        }
    }

    pub fn cascade_policy(&self, policy: &ReleasePolicy) -> CascadePolicy {
        if policy.cascade_dependencies {
            CascadePolicy::PatchBump
        } else {
            CascadePolicy::Skip
        }
    }

    /// Files to rewrite when `component` is released
    pub fn build_updates(&self, component: &Component) -> Vec<FileUpdate> {
        let mut updates = vec![FileUpdate {
            path: component.join_path("CHANGELOG.md"),
            kind: UpdateKind::Changelog,
        }];

        if let Some(file) = self.version_file() {
            updates.push(FileUpdate {
                path: component.join_path(file),
                kind: UpdateKind::VersionManifest,
            });
        }

        for extra in &component.extra_files {
            updates.push(FileUpdate {
                path: component.join_path(extra),
                kind: UpdateKind::ExtraFile,
            });
        }

        updates
    }
}

/// Per-component versioning policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePolicy {
    /// Pre-1.0: breaking changes bump the minor version
    pub bump_minor_pre_major: bool,
    /// Pre-1.0: features (and unflagged breaking changes) bump the patch version
    pub bump_patch_for_minor_pre_major: bool,
    /// Forced version, applied when the component has commits this run
    pub release_as: Option<Version>,
    pub cascade_dependencies: bool,
    pub initial_version: Option<Version>,
}

impl ReleasePolicy {
    /// Version used for a component's first release
    pub fn initial_version(&self) -> Version {
        match &self.initial_version {
            Some(version) => version.clone(),
            None if self.bump_minor_pre_major => Version::new(0, 1, 0),
            None => Version::new(1, 0, 0),
        }
    }
}

impl Default for ReleasePolicy {
    fn default() -> Self {
        ReleasePolicy {
            bump_minor_pre_major: false,
            bump_patch_for_minor_pre_major: false,
            release_as: None,
            cascade_dependencies: true,
            initial_version: None,
        }
    }
}

/// A releasable unit of the repository, keyed by its path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub path: String,
    pub name: String,
    /// Last released version; `None` before the first release
    pub current_version: Option<Version>,
    pub strategy: ComponentStrategy,
    pub policy: ReleasePolicy,
    /// Paths of components this one depends on
    pub dependencies: Vec<String>,
    pub extra_files: Vec<String>,
}

impl Component {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Component {
            path: path.into(),
            name: name.into(),
            current_version: None,
            strategy: ComponentStrategy::default(),
            policy: ReleasePolicy::default(),
            dependencies: Vec::new(),
            extra_files: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.current_version = Some(version);
        self
    }

    pub fn with_dependencies<S: Into<String>>(mut self, dependencies: impl IntoIterator<Item = S>) -> Self {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_policy(mut self, policy: ReleasePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_strategy(mut self, strategy: ComponentStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn is_root(&self) -> bool {
        self.path == ROOT_PATH
    }

    /// Join a file name onto this component's path
    pub fn join_path(&self, file: &str) -> String {
        if self.is_root() {
            file.to_string()
        } else {
            format!("{}/{}", self.path.trim_end_matches('/'), file)
        }
    }

    pub fn cascade_policy(&self) -> CascadePolicy {
        self.strategy.cascade_policy(&self.policy)
    }

    pub fn build_updates(&self) -> Vec<FileUpdate> {
        self.strategy.build_updates(self)
    }
}
