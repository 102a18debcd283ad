//! Version range parsing
//!
//! Supports the range forms used by workspace package manifests:
//! - `1.2.3` - exact match (>=1.2.3 <=1.2.3)
//! - `^1.2.3` - same major (>=1.2.3 <2.0.0)
//! - `~1.2.3` - same major.minor (>=1.2.3 <1.3.0)
//! - `*`, `workspace:*`, `workspace:^`, `workspace:~` - any version
//! - `workspace:<range>` - the range after the protocol prefix

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::WIDEST_MAX;
use crate::version::error::ParseError;
use crate::version::semver::Version;

const WORKSPACE_PROTOCOL: &str = "workspace:";

/// A parsed range specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// Exact version match
    Exact(Version),
    /// Caret range: ^1.2.3 means >=1.2.3 <2.0.0
    Caret(Version),
    /// Tilde range: ~1.2.3 means >=1.2.3 <1.3.0
    Tilde(Version),
    /// Any version
    Wildcard,
}

impl VersionSpec {
    pub fn parse(spec: &str) -> Result<Self, ParseError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ParseError::Empty);
        }

        if let Some(rest) = spec.strip_prefix(WORKSPACE_PROTOCOL) {
            return match rest.trim() {
                "*" | "^" | "~" => Ok(VersionSpec::Wildcard),
                "" => Err(ParseError::UnsupportedRange(spec.to_string())),
                inner => Self::parse(inner),
            };
        }

        if spec == "*" {
            Ok(VersionSpec::Wildcard)
        } else if let Some(rest) = spec.strip_prefix('^') {
            Version::parse(rest).map(VersionSpec::Caret)
        } else if let Some(rest) = spec.strip_prefix('~') {
            Version::parse(rest).map(VersionSpec::Tilde)
        } else if spec.starts_with(['<', '>', '=', '|']) || spec.contains(' ') {
            Err(ParseError::UnsupportedRange(spec.to_string()))
        } else {
            Version::parse(spec).map(VersionSpec::Exact)
        }
    }

    /// Normalize into a `[min, max]` interval.
    ///
    /// Fails when the exclusive upper bound of a caret or tilde range does
    /// not fit in a version component.
    pub fn to_range(&self) -> Result<VersionRange, ParseError> {
        let range = match self {
            VersionSpec::Exact(v) => VersionRange {
                min: v.clone(),
                max: v.clone(),
                exclusive_max: false,
                tested: vec![v.clone()],
                breaking: Vec::new(),
            },
            VersionSpec::Caret(v) => {
                let major = v
                    .major
                    .checked_add(1)
                    .ok_or_else(|| ParseError::UnsupportedRange(format!("^{v}")))?;
                VersionRange::upper_exclusive(v.clone(), Version::new(major, 0, 0))
            }
            VersionSpec::Tilde(v) => {
                let minor = v
                    .minor
                    .checked_add(1)
                    .ok_or_else(|| ParseError::UnsupportedRange(format!("~{v}")))?;
                VersionRange::upper_exclusive(v.clone(), Version::new(v.major, minor, 0))
            }
            VersionSpec::Wildcard => VersionRange::widest(),
        };
        Ok(range)
    }
}

/// An interval of acceptable versions.
///
/// `min` is always inclusive. `max` is inclusive unless `exclusive_max` is
/// set, which is how caret and tilde ranges express their upper bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawVersionRange")]
pub struct VersionRange {
    pub min: Version,
    pub max: Version,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_max: bool,
    #[serde(default)]
    pub tested: Vec<Version>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breaking: Vec<Version>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Wire shape of [`VersionRange`], checked before use
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVersionRange {
    min: Version,
    max: Version,
    #[serde(default)]
    exclusive_max: bool,
    #[serde(default)]
    tested: Vec<Version>,
    #[serde(default)]
    breaking: Vec<Version>,
}

impl TryFrom<RawVersionRange> for VersionRange {
    type Error = ParseError;

    fn try_from(raw: RawVersionRange) -> Result<Self, Self::Error> {
        let range = VersionRange::inclusive(raw.min, raw.max)?;
        Ok(Self {
            exclusive_max: raw.exclusive_max,
            tested: raw.tested,
            breaking: raw.breaking,
            ..range
        })
    }
}

impl VersionRange {
    /// Inclusive range, failing when `min > max`
    pub fn inclusive(min: Version, max: Version) -> Result<Self, ParseError> {
        if min.core() > max.core() {
            return Err(ParseError::InvertedRange {
                input: format!("{min}-{max}"),
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self {
            min,
            max,
            exclusive_max: false,
            tested: Vec::new(),
            breaking: Vec::new(),
        })
    }

    fn upper_exclusive(min: Version, max: Version) -> Self {
        Self {
            min,
            max,
            exclusive_max: true,
            tested: Vec::new(),
            breaking: Vec::new(),
        }
    }

    /// `[0.0.0, 999.999.999]`
    pub fn widest() -> Self {
        let (major, minor, patch) = WIDEST_MAX;
        Self {
            min: Version::new(0, 0, 0),
            max: Version::new(major, minor, patch),
            exclusive_max: false,
            tested: Vec::new(),
            breaking: Vec::new(),
        }
    }

    /// Component-wise containment check. Pre-release tags are ignored.
    pub fn contains(&self, version: &Version) -> bool {
        let v = version.core();
        if v < self.min.core() {
            return false;
        }
        if self.exclusive_max {
            v < self.max.core()
        } else {
            v <= self.max.core()
        }
    }

    /// Same interval (ignores tested/breaking metadata)
    pub fn same_bounds(&self, other: &VersionRange) -> bool {
        self.min.core() == other.min.core()
            && self.max.core() == other.max.core()
            && self.exclusive_max == other.exclusive_max
    }

    pub fn with_tested(mut self, tested: Vec<Version>) -> Self {
        self.tested = tested;
        self
    }

    pub fn with_breaking(mut self, breaking: Vec<Version>) -> Self {
        self.breaking = breaking;
        self
    }

    /// Latest declared breaking release the version has reached, if any
    pub fn crossed_breaking(&self, version: &Version) -> Option<&Version> {
        self.breaking
            .iter()
            .filter(|b| b.core() > self.min.core() && b.core() <= version.core())
            .max()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let close = if self.exclusive_max { ')' } else { ']' };
        write!(f, "[{}, {}{}", self.min, self.max, close)
    }
}

/// Parse a range specification into a normalized [`VersionRange`]
pub fn parse_range(spec: &str) -> Result<VersionRange, ParseError> {
    VersionSpec::parse(spec)?.to_range()
}
