use semver::Version;
use std::fmt;

/// Tag naming rules for a component (e.g. "core-v1.2.3" or "v1.2.3")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFormat {
    pub component: Option<String>,
    pub separator: String,
    pub include_v: bool,
}

impl TagFormat {
    /// Create a new tag format
    pub fn new(component: Option<String>, separator: impl Into<String>, include_v: bool) -> Self {
        TagFormat {
            component,
            separator: separator.into(),
            include_v,
        }
    }

    /// Format a version according to this format
    /// Example: component="core", separator="-", version=1.2.3 -> "core-v1.2.3"
    pub fn format(&self, version: &Version) -> TagName {
        let version_part = if self.include_v {
            format!("v{}", version)
        } else {
            version.to_string()
        };

        let name = match &self.component {
            Some(component) if !component.is_empty() => {
                format!("{}{}{}", component, self.separator, version_part)
            }
            _ => version_part,
        };

        TagName { name }
    }
}

impl Default for TagFormat {
    fn default() -> Self {
        TagFormat::new(None, "-", true)
    }
}

/// Represents a release tag name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagName {
    pub name: String,
}

impl TagName {
    /// Create a new tag from a string
    pub fn new(name: impl Into<String>) -> Self {
        TagName { name: name.into() }
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
