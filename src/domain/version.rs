use crate::error::{ReleasePlanError, Result};
use semver::Version;
use serde::Serialize;
use std::fmt;

/// How a component's version moves this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    None,
    Patch,
    Minor,
    Major,
    /// Release exactly this version (`Release-As` footer or config override)
    Exact(Version),
}

impl BumpLevel {
    pub fn is_none(&self) -> bool {
        matches!(self, BumpLevel::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BumpLevel::None => "none",
            BumpLevel::Patch => "patch",
            BumpLevel::Minor => "minor",
            BumpLevel::Major => "major",
            BumpLevel::Exact(_) => "exact",
        }
    }
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpLevel::Exact(target) => write!(f, "exact ({})", target),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Version bump decision for one component, with an audit reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionBump {
    pub level: BumpLevel,
    pub reason: String,
}

impl VersionBump {
    /// Create a new bump decision
    pub fn new(level: BumpLevel, reason: impl Into<String>) -> Self {
        VersionBump {
            level,
            reason: reason.into(),
        }
    }

    /// A decision that produces no release
    pub fn none(reason: impl Into<String>) -> Self {
        VersionBump::new(BumpLevel::None, reason)
    }

    /// Whether this decision produces a release candidate
    pub fn is_release(&self) -> bool {
        !self.level.is_none()
    }

    /// Explicit target version, if the bump is an override
    pub fn target(&self) -> Option<&Version> {
        match &self.level {
            BumpLevel::Exact(target) => Some(target),
            _ => None,
        }
    }
}

/// Parse a semantic version, tolerating a leading 'v' or 'V' (e.g. "v1.2.3")
pub fn parse_version(input: &str) -> Result<Version> {
    let clean = input
        .trim()
        .trim_start_matches('v')
        .trim_start_matches('V');

    Version::parse(clean).map_err(|e| {
        ReleasePlanError::version(format!("Invalid version format: '{}' - {}", input, e))
    })
}

/// Bump version according to bump level
///
/// Pre-release and build metadata are dropped by arithmetic bumps; an exact
/// level returns its target unchanged. `BumpLevel::None` returns the input.
pub fn bump_version(version: &Version, level: &BumpLevel) -> Version {
    match level {
        BumpLevel::None => version.clone(),
        BumpLevel::Major => Version::new(version.major + 1, 0, 0),
        BumpLevel::Minor => Version::new(version.major, version.minor + 1, 0),
        BumpLevel::Patch => Version::new(version.major, version.minor, version.patch + 1),
        BumpLevel::Exact(target) => target.clone(),
    }
}
