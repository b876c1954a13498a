use crate::changelog::{default_sections, ChangelogSection, RepositoryLink};
use crate::domain::version::parse_version;
use crate::domain::component::normalize_path;
use crate::domain::{Component, ComponentStrategy, ReleasePolicy, TagFormat};
use crate::error::{ReleasePlanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file names searched in the working directory, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["release-plan.json", "release-plan.toml"];

/// Represents the complete configuration for release-plan.
///
/// Top-level options act as defaults for every package; each entry of
/// `packages` is keyed by the component path relative to the repository root.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub release_type: ComponentStrategy,

    #[serde(default)]
    pub bump_minor_pre_major: bool,

    #[serde(default)]
    pub bump_patch_for_minor_pre_major: bool,

    #[serde(default = "default_sections")]
    pub changelog_sections: Vec<ChangelogSection>,

    #[serde(default)]
    pub include_empty_commits: bool,

    #[serde(default = "default_true")]
    pub include_component_in_tag: bool,

    #[serde(default = "default_true")]
    pub include_v_in_tag: bool,

    #[serde(default = "default_tag_separator")]
    pub tag_separator: String,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub initial_version: Option<String>,

    #[serde(default = "default_packages")]
    pub packages: BTreeMap<String, PackageConfig>,
}

fn default_true() -> bool {
    true
}

fn default_tag_separator() -> String {
    "-".to_string()
}

fn default_host() -> String {
    "https://github.com".to_string()
}

/// A single component at the repository root
fn default_packages() -> BTreeMap<String, PackageConfig> {
    BTreeMap::from([(".".to_string(), PackageConfig::default())])
}

/// Where the repository is hosted, for compare/commit/issue links
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            host: default_host(),
            owner: None,
            name: None,
        }
    }
}

impl RepositoryConfig {
    /// Link coordinates, available only when both owner and name are set
    pub fn link(&self) -> Option<RepositoryLink> {
        match (&self.owner, &self.name) {
            (Some(owner), Some(name)) => Some(RepositoryLink::new(&self.host, owner, name)),
            _ => None,
        }
    }
}

/// Per-package overrides; unset options inherit the top-level value
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct PackageConfig {
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub release_type: Option<ComponentStrategy>,
    #[serde(default)]
    pub bump_minor_pre_major: Option<bool>,
    #[serde(default)]
    pub bump_patch_for_minor_pre_major: Option<bool>,
    #[serde(default)]
    pub release_as: Option<String>,
    #[serde(default)]
    pub extra_files: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub cascade_dependencies: Option<bool>,
    #[serde(default)]
    pub initial_version: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            release_type: ComponentStrategy::default(),
            bump_minor_pre_major: false,
            bump_patch_for_minor_pre_major: false,
            changelog_sections: default_sections(),
            include_empty_commits: false,
            include_component_in_tag: true,
            include_v_in_tag: true,
            tag_separator: default_tag_separator(),
            repository: RepositoryConfig::default(),
            initial_version: None,
            packages: default_packages(),
        }
    }
}

/// Default component name: the last path segment, or the repository name at the root
fn default_component_name(path: &str, repository: &RepositoryConfig) -> String {
    if path == "." {
        return repository.name.clone().unwrap_or_else(|| "root".to_string());
    }
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

impl Config {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse by file extension: `.json` is JSON, anything else TOML
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReleasePlanError::config(format!("cannot read '{}': {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    /// Build validated components, sorted by path.
    ///
    /// Package paths and dependency entries are normalised (`./a/` and `a` are the
    /// same component). Versions are left unset; the manifest supplies them at plan time.
    pub fn components(&self) -> Result<Vec<Component>> {
        let initial_version = self
            .initial_version
            .as_deref()
            .map(|v| {
                parse_version(v).map_err(|_| {
                    ReleasePlanError::config(format!("invalid initial-version '{}'", v))
                })
            })
            .transpose()?;

        let mut paths = BTreeSet::new();
        for raw in self.packages.keys() {
            let path = normalize_path(raw);
            if !paths.insert(path.clone()) {
                return Err(ReleasePlanError::config(format!(
                    "package '{}' is configured more than once",
                    path
                )));
            }
        }

        let mut components = Vec::with_capacity(self.packages.len());
        for (raw_path, package) in &self.packages {
            let path = normalize_path(raw_path);
            let dependencies: Vec<String> = package
                .dependencies
                .iter()
                .map(|dependency| normalize_path(dependency))
                .collect();
            for dependency in &dependencies {
                if !paths.contains(dependency) {
                    return Err(ReleasePlanError::UnknownDependency {
                        component: path.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }

            let release_as = package
                .release_as
                .as_deref()
                .map(|v| parse_version(v).map_err(|_| ReleasePlanError::invalid_release_as(&path, v)))
                .transpose()?;

            let package_initial = package
                .initial_version
                .as_deref()
                .map(|v| {
                    parse_version(v).map_err(|_| {
                        ReleasePlanError::config(format!(
                            "invalid initial-version '{}' for component '{}'",
                            v, path
                        ))
                    })
                })
                .transpose()?;

            let policy = ReleasePolicy {
                bump_minor_pre_major: package
                    .bump_minor_pre_major
                    .unwrap_or(self.bump_minor_pre_major),
                bump_patch_for_minor_pre_major: package
                    .bump_patch_for_minor_pre_major
                    .unwrap_or(self.bump_patch_for_minor_pre_major),
                release_as,
                cascade_dependencies: package.cascade_dependencies.unwrap_or(true),
                initial_version: package_initial.or_else(|| initial_version.clone()),
            };

            let name = package
                .component
                .clone()
                .unwrap_or_else(|| default_component_name(&path, &self.repository));

            let mut component = Component::new(path, name)
                .with_strategy(package.release_type.unwrap_or(self.release_type))
                .with_policy(policy)
                .with_dependencies(dependencies);
            component.extra_files = package.extra_files.clone();
            components.push(component);
        }

        components.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(components)
    }

    /// Tag naming for a component
    pub fn tag_format(&self, component: &Component) -> TagFormat {
        let name = if self.include_component_in_tag && !component.is_root() {
            Some(component.name.clone())
        } else {
            None
        };
        TagFormat::new(name, self.tag_separator.clone(), self.include_v_in_tag)
    }
}

/// Locate the configuration file to use, if any.
///
/// Search order:
/// 1. Custom path provided as parameter
/// 2. `release-plan.json` then `release-plan.toml` in the current directory
/// 3. `release-plan.toml` in the user config directory
pub fn find_config(config_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = config_path {
        return Some(path.to_path_buf());
    }

    for name in CONFIG_FILE_NAMES {
        let candidate = Path::new(".").join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("release-plan.toml"))
        .filter(|path| path.exists())
}

/// Loads configuration from file or returns defaults.
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file was found (or given) but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match find_config(config_path) {
        Some(path) => Config::from_file(&path),
        None => Ok(Config::default()),
    }
}
