use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::version::error::ParseError;

/// A `major.minor.patch` version.
///
/// Pre-release tags (`-alpha.1`, `-rc.2`, ...) are kept so the version prints
/// back the way it was declared, but they never take part in range
/// containment: [`Version::core`] is what ranges compare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pre: Option<String>,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Parse a version string, normalizing partial versions.
    ///
    /// Handles partial versions like "1" or "1.2" by padding with zeros and
    /// strips a leading `v` ("v1.2.3"). Build metadata is discarded.
    ///
    /// Examples:
    /// - "1" -> 1.0.0
    /// - "1.2" -> 1.2.0
    /// - "1.2.3-beta.1" -> 1.2.3 (pre-release)
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }
        let version = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let (core, suffix) = match version.find(['-', '+']) {
            Some(idx) => version.split_at(idx),
            None => (version, ""),
        };
        let normalized = match core.split('.').count() {
            1 => format!("{core}.0.0{suffix}"),
            2 => format!("{core}.0{suffix}"),
            _ => version.to_string(),
        };

        let parsed =
            semver::Version::parse(&normalized).map_err(|e| ParseError::InvalidVersion {
                input: input.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre: (!parsed.pre.is_empty()).then(|| parsed.pre.to_string()),
        })
    }

    /// Numeric triple used for ordering and range checks
    pub fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }
}

impl Ord for Version {
    /// Orders by the numeric triple. On a tie a pre-release sorts before the
    /// release, then tags compare as strings.
    fn cmp(&self, other: &Self) -> Ordering {
        self.core()
            .cmp(&other.core())
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Sort versions newest first, keeping the first occurrence of duplicates
pub fn newest_first(versions: &[Version]) -> Vec<Version> {
    let mut sorted: Vec<Version> = Vec::with_capacity(versions.len());
    for version in versions {
        if !sorted.contains(version) {
            sorted.push(version.clone());
        }
    }
    sorted.sort_by(|a, b| b.cmp(a));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Version::new(1, 0, 0))]
    #[case("1.2", Version::new(1, 2, 0))]
    #[case("1.2.3", Version::new(1, 2, 3))]
    #[case("v1.2.3", Version::new(1, 2, 3))]
    #[case(" 10.0.1 ", Version::new(10, 0, 1))]
    #[case("1.2.3+build.5", Version::new(1, 2, 3))]
    fn parse_normalizes_release_versions(#[case] input: &str, #[case] expected: Version) {
        assert_eq!(Version::parse(input).unwrap(), expected);
    }

    #[rstest]
    #[case("1.0.0-alpha.1", "1.0.0-alpha.1")]
    #[case("2.1.0-rc.2", "2.1.0-rc.2")]
    #[case("2.1-beta", "2.1.0-beta")]
    fn parse_keeps_prerelease_tag(#[case] input: &str, #[case] display: &str) {
        let version = Version::parse(input).unwrap();
        assert!(version.is_prerelease());
        assert_eq!(version.to_string(), display);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("abc")]
    #[case("1.x.0")]
    #[case("1.2.three")]
    #[case("1..3")]
    #[case("1.2.3.4")]
    fn parse_rejects_malformed_versions(#[case] input: &str) {
        assert!(Version::parse(input).is_err(), "{input:?} should not parse");
    }

    #[test]
    fn ordering_is_numeric_not_lexical() {
        let small = Version::parse("1.9.0").unwrap();
        let large = Version::parse("1.10.0").unwrap();

        assert!(small < large);
    }

    #[test]
    fn prerelease_shares_core_with_release() {
        let pre = Version::parse("1.2.3-beta").unwrap();
        let release = Version::parse("1.2.3").unwrap();

        assert_eq!(pre.core(), release.core());
        assert!(pre < release);
    }

    #[test]
    fn newest_first_sorts_descending_and_dedupes() {
        let versions: Vec<Version> = ["1.0.0", "1.2.0", "1.0.0", "0.9.0"]
            .iter()
            .map(|v| Version::parse(v).unwrap())
            .collect();

        let sorted: Vec<String> = newest_first(&versions)
            .iter()
            .map(|v| v.to_string())
            .collect();

        assert_eq!(sorted, vec!["1.2.0", "1.0.0", "0.9.0"]);
    }

    #[test]
    fn serde_uses_plain_strings() {
        let version: Version = serde_json::from_str("\"1.4.2\"").unwrap();
        assert_eq!(version, Version::new(1, 4, 2));
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"1.4.2\"");
        assert!(serde_json::from_str::<Version>("\"one\"").is_err());
    }
}
