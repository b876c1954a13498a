use thiserror::Error;

/// Unified error type for release planning
#[derive(Error, Debug)]
pub enum ReleasePlanError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Manifest error in '{path}': {message}")]
    Manifest { path: String, message: String },

    #[error("Dependency cycle detected: {chain}")]
    DependencyCycle { chain: String },

    #[error("Component '{component}' depends on unknown component '{dependency}'")]
    UnknownDependency {
        component: String,
        dependency: String,
    },

    #[error("Commit {sha} is missing its changed-file list")]
    MissingFiles { sha: String },

    #[error("Invalid release-as version '{value}' for component '{component}'")]
    InvalidReleaseAs { component: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience type alias for Results in release-plan
pub type Result<T> = std::result::Result<T, ReleasePlanError>;

impl ReleasePlanError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleasePlanError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleasePlanError::Version(msg.into())
    }

    /// Create a manifest error for the given manifest path
    pub fn manifest(path: impl Into<String>, msg: impl Into<String>) -> Self {
        ReleasePlanError::Manifest {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a cycle error from the visited chain, closing it on `repeated`
    pub fn cycle(chain: &[String], repeated: &str) -> Self {
        let mut parts: Vec<&str> = chain.iter().map(String::as_str).collect();
        parts.push(repeated);
        ReleasePlanError::DependencyCycle {
            chain: parts.join(" -> "),
        }
    }

    pub fn invalid_release_as(component: impl Into<String>, value: impl Into<String>) -> Self {
        ReleasePlanError::InvalidReleaseAs {
            component: component.into(),
            value: value.into(),
        }
    }
}
