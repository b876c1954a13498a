use semver::Version;
use serde::Serialize;
use std::fmt;

/// Non-fatal issues found while planning a release.
/// These never abort a run but should be reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PlanWarning {
    /// A release-as target does not move the version forward
    NonMonotonicVersion {
        component: String,
        previous: Version,
        target: Version,
    },
    /// The computed version is already recorded in the manifest
    AlreadyReleased { component: String, version: Version },
    /// A commit changed no file under any configured component
    UnassignedCommit { sha: String },
    /// A dependency was bumped but the dependent has cascading disabled
    CascadeSkipped { component: String, dependency: String },
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::NonMonotonicVersion {
                component,
                previous,
                target,
            } => write!(
                f,
                "Component '{}' is released as {} which is not greater than {}",
                component, target, previous
            ),
            PlanWarning::AlreadyReleased { component, version } => {
                write!(f, "Component '{}' is already at {}", component, version)
            }
            PlanWarning::UnassignedCommit { sha } => write!(
                f,
                "Commit {} does not touch any configured component",
                short_sha(sha)
            ),
            PlanWarning::CascadeSkipped {
                component,
                dependency,
            } => write!(
                f,
                "Component '{}' not released for updated dependency '{}' (cascading disabled)",
                component, dependency
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_monotonic_display() {
        let warning = PlanWarning::NonMonotonicVersion {
            component: "packages/core".to_string(),
            previous: Version::new(2, 0, 0),
            target: Version::new(1, 5, 0),
        };
        assert_eq!(
            warning.to_string(),
            "Component 'packages/core' is released as 1.5.0 which is not greater than 2.0.0"
        );
    }

    #[test]
    fn test_unassigned_commit_uses_short_sha() {
        let warning = PlanWarning::UnassignedCommit {
            sha: "abc1234def5678".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "Commit abc1234 does not touch any configured component"
        );

        let warning = PlanWarning::UnassignedCommit {
            sha: "abc".to_string(),
        };
        assert!(warning.to_string().contains("abc"));
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = PlanWarning::CascadeSkipped {
            component: "b".to_string(),
            dependency: "a".to_string(),
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "cascade-skipped");
        assert_eq!(json["component"], "b");
    }
}
