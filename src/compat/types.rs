//! Data types shared by the matrix builder, validator and report

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::version::{Version, VersionRange};

/// Compatibility data for one known package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Filled from the snapshot key when loading a manifest
    #[serde(default, skip_serializing)]
    pub name: String,
    pub current_version: Version,
    pub supported_versions: Vec<Version>,
    pub dependencies: IndexMap<String, VersionRange>,
}

/// Author-declared breaking change between two versions of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakingChange {
    pub package: String,
    pub from_version: Version,
    pub to_version: Version,
    pub changes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_guide: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codemod: Option<String>,
}

impl BreakingChange {
    /// Whether `version` still sits before this change (`from <= version < to`)
    pub fn affects(&self, version: &Version) -> bool {
        version.core() >= self.from_version.core() && version.core() < self.to_version.core()
    }
}

/// Problem that makes a version assignment invalid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum CompatibilityIssue {
    MissingDependency {
        package: String,
        package_version: Version,
        dependency: String,
    },
    IncompatibleVersion {
        package: String,
        package_version: Version,
        dependency: String,
        expected: VersionRange,
        actual: Version,
    },
}

impl CompatibilityIssue {
    pub fn package(&self) -> &str {
        match self {
            CompatibilityIssue::MissingDependency { package, .. }
            | CompatibilityIssue::IncompatibleVersion { package, .. } => package,
        }
    }

    pub fn dependency(&self) -> &str {
        match self {
            CompatibilityIssue::MissingDependency { dependency, .. }
            | CompatibilityIssue::IncompatibleVersion { dependency, .. } => dependency,
        }
    }
}

impl fmt::Display for CompatibilityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityIssue::MissingDependency {
                package,
                package_version,
                dependency,
            } => write!(f, "{package}@{package_version} requires {dependency}"),
            CompatibilityIssue::IncompatibleVersion {
                package,
                package_version,
                dependency,
                expected,
                actual,
            } => write!(
                f,
                "{package}@{package_version} requires {dependency}@{expected}, but {actual} is installed"
            ),
        }
    }
}

/// Non-blocking observation about a version assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum CompatibilityWarning {
    UnknownPackage {
        package: String,
    },
    Prerelease {
        package: String,
        version: Version,
    },
    /// The installed dependency is in range but at or past a breaking
    /// release the consumer's range was declared before
    BreakingRelease {
        package: String,
        dependency: String,
        breaking_version: Version,
        actual: Version,
    },
}

impl CompatibilityWarning {
    pub fn package(&self) -> &str {
        match self {
            CompatibilityWarning::UnknownPackage { package }
            | CompatibilityWarning::Prerelease { package, .. }
            | CompatibilityWarning::BreakingRelease { package, .. } => package,
        }
    }
}

impl fmt::Display for CompatibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityWarning::UnknownPackage { package } => {
                write!(f, "Package {package} not found in manifest")
            }
            CompatibilityWarning::Prerelease { package, version } => {
                write!(f, "Using prerelease version {package}@{version}")
            }
            CompatibilityWarning::BreakingRelease {
                package,
                dependency,
                breaking_version,
                actual,
            } => write!(
                f,
                "{package} was declared before the breaking release {dependency}@{breaking_version} ({actual} is installed)"
            ),
        }
    }
}

/// Version that resolves every incompatibility reported for a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub package: String,
    pub suggested_version: Version,
    pub reason: String,
}

/// Package for which no supported version satisfies all demanded ranges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedConflict {
    pub package: String,
    pub ranges: Vec<VersionRange>,
}

impl fmt::Display for UnresolvedConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranges: Vec<String> = self.ranges.iter().map(ToString::to_string).collect();
        write!(
            f,
            "No supported version of {} satisfies {}",
            self.package,
            ranges.join(" and ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<CompatibilityIssue>,
    pub warnings: Vec<CompatibilityWarning>,
    pub suggestions: Vec<Suggestion>,
    pub unresolved: Vec<UnresolvedConflict>,
}
