//! Common types for manifest parsing

use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// Package declaration as read from a manifest, before any version parsing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawPackageDescriptor {
    /// Package name (e.g., "@brutal/components")
    pub name: String,
    /// Current version string
    pub version: String,
    /// Dependency name -> range spec, in declaration order
    pub dependencies: IndexMap<String, String>,
    /// Versions of dependencies the author tested against
    pub tested: Vec<String>,
    /// Previous versions of this package that the current version breaks
    pub breaking: Vec<String>,
    /// Older versions of this package that are still supported
    pub supported_versions: Vec<String>,
}

impl RawPackageDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>, spec: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), spec.into());
        self
    }
}

/// Error type for manifest reading
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid package argument {0:?}: expected name@version")]
    InvalidPackageArg(String),
}

static PACKAGE_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@[^@/\s]+/[^@/\s]+|[^@/\s]+)@([^@\s]+)$").expect("valid package arg regex")
});

/// Split a `name@version` argument (scoped names allowed)
pub fn parse_package_arg(arg: &str) -> Result<(String, String), ManifestError> {
    let captures = PACKAGE_ARG
        .captures(arg.trim())
        .ok_or_else(|| ManifestError::InvalidPackageArg(arg.to_string()))?;
    Ok((captures[1].to_string(), captures[2].to_string()))
}
