//! Manifest state: the persisted `path -> last released version` record.

use crate::domain::component::normalize_path;
use crate::domain::version::parse_version;
use crate::error::{ReleasePlanError, Result};
use semver::Version;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Default manifest file name, relative to the repository root
pub const DEFAULT_MANIFEST_FILE: &str = ".release-please-manifest.json";

/// Anything that carries a computed version for a component
pub trait ReleasedVersion {
    fn released_version(&self) -> &Version;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    versions: BTreeMap<String, Version>,
}

impl Manifest {
    /// Load a manifest file; a missing file is an empty manifest
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Manifest::default());
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::parse(json, "<inline>")
    }

    fn parse(json: &str, origin: &str) -> Result<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|e| ReleasePlanError::manifest(origin, e.to_string()))?;

        let mut versions = BTreeMap::new();
        for (path, version) in raw {
            let parsed = parse_version(&version).map_err(|_| {
                ReleasePlanError::manifest(
                    origin,
                    format!("invalid version '{}' for component '{}'", version, path),
                )
            })?;
            let key = normalize_path(&path);
            if versions.insert(key.clone(), parsed).is_some() {
                return Err(ReleasePlanError::manifest(
                    origin,
                    format!("component '{}' is listed more than once", key),
                ));
            }
        }

        Ok(Manifest { versions })
    }

    /// Recorded version for a component; `./a/` and `a` name the same entry
    pub fn get(&self, path: &str) -> Option<&Version> {
        self.versions.get(&normalize_path(path))
    }

    pub fn set(&mut self, path: impl AsRef<str>, version: Version) {
        self.versions.insert(normalize_path(path.as_ref()), version);
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Version)> {
        self.versions.iter()
    }

    /// Candidates whose computed version differs from the recorded one
    pub fn diff<T: ReleasedVersion + Clone>(&self, candidates: &BTreeMap<String, T>) -> BTreeMap<String, T> {
        candidates
            .iter()
            .filter(|(path, candidate)| self.get(path) != Some(candidate.released_version()))
            .map(|(path, candidate)| (path.clone(), candidate.clone()))
            .collect()
    }

    /// Record the released versions of confirmed candidates
    pub fn apply<T: ReleasedVersion>(&mut self, candidates: &BTreeMap<String, T>) {
        for (path, candidate) in candidates {
            self.set(path, candidate.released_version().clone());
        }
    }

    /// Pretty JSON with sorted keys and a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let raw: BTreeMap<&str, String> = self
            .versions
            .iter()
            .map(|(path, version)| (path.as_str(), version.to_string()))
            .collect();
        let mut json = serde_json::to_string_pretty(&raw)?;
        json.push('\n');
        Ok(json)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
