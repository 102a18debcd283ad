//! Suggestion engine
//!
//! For each dependency that some consumer found out of range, pick the newest
//! supported version satisfying every demanded range at once. When none does,
//! the conflict is reported as unresolved instead of guessing.

use indexmap::IndexMap;
use tracing::debug;

use crate::compat::matrix::CompatibilityMatrix;
use crate::compat::types::{CompatibilityIssue, Suggestion, UnresolvedConflict};
use crate::version::semver::newest_first;
use crate::version::{Version, VersionRange};

const SATISFIES_ALL: &str = "Satisfies all dependencies";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestions {
    pub suggestions: Vec<Suggestion>,
    pub unresolved: Vec<UnresolvedConflict>,
}

pub fn suggest(matrix: &CompatibilityMatrix, issues: &[CompatibilityIssue]) -> Suggestions {
    let mut demanded: IndexMap<&str, Vec<&VersionRange>> = IndexMap::new();
    for issue in issues {
        if let CompatibilityIssue::IncompatibleVersion {
            dependency,
            expected,
            ..
        } = issue
        {
            let ranges = demanded.entry(dependency.as_str()).or_default();
            if !ranges.iter().any(|r| r.same_bounds(expected)) {
                ranges.push(expected);
            }
        }
    }

    let mut result = Suggestions::default();
    for (package, ranges) in demanded {
        match find_compatible_version(matrix, package, &ranges) {
            Some(version) => {
                debug!("Suggesting {}@{}", package, version);
                result.suggestions.push(Suggestion {
                    package: package.to_string(),
                    suggested_version: version,
                    reason: SATISFIES_ALL.to_string(),
                });
            }
            None => {
                debug!("No supported version of {} satisfies all ranges", package);
                result.unresolved.push(UnresolvedConflict {
                    package: package.to_string(),
                    ranges: ranges.into_iter().cloned().collect(),
                });
            }
        }
    }
    result
}

/// Newest supported version of `package` inside every range.
///
/// Containment is the only check `validate` turns into an issue, so any
/// version returned here clears every conflict it was searched for.
fn find_compatible_version(
    matrix: &CompatibilityMatrix,
    package: &str,
    ranges: &[&VersionRange],
) -> Option<Version> {
    let pkg = matrix.package(package)?;
    newest_first(&pkg.supported_versions)
        .into_iter()
        .find(|version| ranges.iter().all(|range| range.contains(version)))
}
