//! Version assignment validation against the compatibility matrix

use indexmap::IndexMap;
use tracing::debug;

use crate::compat::manifest::VersionManifest;
use crate::compat::matrix::CompatibilityMatrix;
use crate::compat::suggest::{Suggestions, suggest};
use crate::compat::types::{CompatibilityIssue, CompatibilityWarning, ValidationResult};
use crate::config::ValidationPolicy;
use crate::version::{ParseError, Version};

/// Validates package version assignments against a read-only matrix
#[derive(Debug, Clone)]
pub struct CompatibilitySystem {
    matrix: CompatibilityMatrix,
    policy: ValidationPolicy,
}

impl CompatibilitySystem {
    pub fn new(matrix: CompatibilityMatrix, policy: ValidationPolicy) -> Self {
        Self { matrix, policy }
    }

    pub fn from_manifest(manifest: &VersionManifest) -> Self {
        Self::new(manifest.to_matrix(), manifest.validation)
    }

    pub fn matrix(&self) -> &CompatibilityMatrix {
        &self.matrix
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Check every known package's dependencies against the assignment.
    ///
    /// Issues follow assignment order, then dependency declaration order.
    /// At most one issue is reported per package/dependency pair.
    pub fn validate(&self, assignment: &IndexMap<String, Version>) -> ValidationResult {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        for (name, version) in assignment {
            if version.is_prerelease() && !self.policy.allow_prerelease {
                warnings.push(CompatibilityWarning::Prerelease {
                    package: name.clone(),
                    version: version.clone(),
                });
            }

            let Some(pkg) = self.matrix.package(name) else {
                debug!("{} is not in the matrix", name);
                warnings.push(CompatibilityWarning::UnknownPackage {
                    package: name.clone(),
                });
                continue;
            };

            for (dep_name, range) in &pkg.dependencies {
                let Some(actual) = assignment.get(dep_name) else {
                    issues.push(CompatibilityIssue::MissingDependency {
                        package: name.clone(),
                        package_version: version.clone(),
                        dependency: dep_name.clone(),
                    });
                    continue;
                };

                if !range.contains(actual) {
                    issues.push(CompatibilityIssue::IncompatibleVersion {
                        package: name.clone(),
                        package_version: version.clone(),
                        dependency: dep_name.clone(),
                        expected: range.clone(),
                        actual: actual.clone(),
                    });
                } else if let Some(breaking) = range.crossed_breaking(actual) {
                    warnings.push(CompatibilityWarning::BreakingRelease {
                        package: name.clone(),
                        dependency: dep_name.clone(),
                        breaking_version: breaking.clone(),
                        actual: actual.clone(),
                    });
                }
            }
        }

        let Suggestions {
            suggestions,
            unresolved,
        } = if issues.is_empty() {
            Suggestions::default()
        } else {
            suggest(&self.matrix, &issues)
        };

        debug!(
            "Validated {} packages: {} issues, {} warnings",
            assignment.len(),
            issues.len(),
            warnings.len()
        );

        ValidationResult {
            valid: issues.is_empty(),
            issues,
            warnings,
            suggestions,
            unresolved,
        }
    }

    /// Install-hook entry point taking raw version strings.
    ///
    /// Any unparseable version aborts validation.
    pub fn validate_specs(
        &self,
        packages: &IndexMap<String, String>,
    ) -> Result<ValidationResult, ParseError> {
        let assignment = packages
            .iter()
            .map(|(name, raw)| Version::parse(raw).map(|v| (name.clone(), v)))
            .collect::<Result<IndexMap<_, _>, _>>()?;
        Ok(self.validate(&assignment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::matrix;
    use crate::parser::types::RawPackageDescriptor;
    use rstest::rstest;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn assignment(pairs: &[(&str, &str)]) -> IndexMap<String, Version> {
        pairs
            .iter()
            .map(|(name, version)| (name.to_string(), v(version)))
            .collect()
    }

    fn system(policy: ValidationPolicy) -> CompatibilitySystem {
        let mut events = RawPackageDescriptor::new("@brutal/events", "1.0.0");
        events.supported_versions = vec!["0.9.0".to_string()];
        let mut foundation = RawPackageDescriptor::new("@brutal/foundation", "1.0.0");
        foundation.supported_versions = vec!["1.1.0".to_string(), "2.0.0".to_string()];
        let matrix = matrix::build(&[
            foundation,
            events,
            RawPackageDescriptor::new("@brutal/components", "1.0.0")
                .with_dependency("@brutal/foundation", "^1.0.0")
                .with_dependency("@brutal/events", "^1.0.0"),
        ])
        .unwrap();
        CompatibilitySystem::new(matrix, policy)
    }

    #[test]
    fn validate_accepts_consistent_assignment() {
        let result = system(ValidationPolicy::default()).validate(&assignment(&[
            ("@brutal/foundation", "1.0.0"),
            ("@brutal/events", "1.0.0"),
            ("@brutal/components", "1.0.0"),
        ]));

        assert!(result.valid);
        assert!(result.issues.is_empty());
        assert!(result.warnings.is_empty());
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn validate_reports_single_incompatible_pair_with_suggestion() {
        let result = system(ValidationPolicy::default()).validate(&assignment(&[
            ("@brutal/foundation", "2.0.0"),
            ("@brutal/events", "1.0.0"),
            ("@brutal/components", "1.0.0"),
        ]));

        assert!(!result.valid);
        assert_eq!(result.issues.len(), 1);
        let CompatibilityIssue::IncompatibleVersion {
            package,
            dependency,
            expected,
            actual,
            ..
        } = &result.issues[0]
        else {
            panic!("expected incompatible version, got {:?}", result.issues[0]);
        };
        assert_eq!(package, "@brutal/components");
        assert_eq!(dependency, "@brutal/foundation");
        assert_eq!(expected.to_string(), "[1.0.0, 2.0.0)");
        assert_eq!(actual, &v("2.0.0"));
        assert_eq!(result.suggestions[0].suggested_version, v("1.1.0"));
    }

    #[test]
    fn validate_reports_missing_dependency_in_declaration_order() {
        let result = system(ValidationPolicy::default())
            .validate(&assignment(&[("@brutal/components", "1.0.0")]));

        let pairs: Vec<(&str, &str)> = result
            .issues
            .iter()
            .map(|i| (i.package(), i.dependency()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("@brutal/components", "@brutal/foundation"),
                ("@brutal/components", "@brutal/events"),
            ]
        );
        assert!(
            result
                .issues
                .iter()
                .all(|i| matches!(i, CompatibilityIssue::MissingDependency { .. }))
        );
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn validate_warns_about_unknown_package_without_invalidating() {
        let result = system(ValidationPolicy::default()).validate(&assignment(&[
            ("@brutal/foundation", "1.0.0"),
            ("@brutal/experimental", "0.1.0"),
        ]));

        assert!(result.valid);
        assert_eq!(
            result.warnings,
            vec![CompatibilityWarning::UnknownPackage {
                package: "@brutal/experimental".to_string()
            }]
        );
    }

    #[rstest]
    #[case(false, 1)]
    #[case(true, 0)]
    fn validate_prerelease_warning_follows_policy(
        #[case] allow_prerelease: bool,
        #[case] expected_warnings: usize,
    ) {
        let policy = ValidationPolicy {
            allow_prerelease,
            ..ValidationPolicy::default()
        };
        let result = system(policy).validate(&assignment(&[
            ("@brutal/foundation", "1.0.0-rc.1"),
            ("@brutal/events", "1.0.0"),
            ("@brutal/components", "1.0.0"),
        ]));

        assert!(result.valid);
        assert_eq!(result.warnings.len(), expected_warnings);
    }

    #[test]
    fn validate_unresolvable_conflict_is_reported_not_suggested() {
        let mut events = RawPackageDescriptor::new("@brutal/events", "1.0.0");
        events.supported_versions = vec!["0.9.0".to_string()];
        let matrix = matrix::build(&[
            events,
            RawPackageDescriptor::new("@brutal/components", "1.0.0")
                .with_dependency("@brutal/events", "~1.1.0"),
        ])
        .unwrap();
        let system = CompatibilitySystem::new(matrix, ValidationPolicy::default());

        let result = system.validate(&assignment(&[
            ("@brutal/events", "2.0.0"),
            ("@brutal/components", "1.0.0"),
        ]));

        assert!(!result.valid);
        assert!(result.suggestions.is_empty());
        assert_eq!(result.unresolved[0].package, "@brutal/events");
    }

    #[test]
    fn validate_warns_about_crossed_breaking_release_without_invalidating() {
        let mut foundation = RawPackageDescriptor::new("@brutal/foundation", "1.4.0");
        foundation.breaking = vec!["1.3.0".to_string()];
        let matrix = matrix::build(&[
            foundation,
            RawPackageDescriptor::new("@brutal/state", "1.0.0")
                .with_dependency("@brutal/foundation", "^1.0.0"),
        ])
        .unwrap();
        let system = CompatibilitySystem::new(matrix, ValidationPolicy::default());

        let result = system.validate(&assignment(&[
            ("@brutal/foundation", "1.4.0"),
            ("@brutal/state", "1.0.0"),
        ]));

        assert!(result.valid);
        assert!(result.issues.is_empty());
        assert!(matches!(
            result.warnings.as_slice(),
            [CompatibilityWarning::BreakingRelease { breaking_version, .. }] if *breaking_version == v("1.4.0")
        ));
    }

    #[test]
    fn validate_accepts_wildcard_consumer_of_package_with_breaking_changes() {
        let mut foundation = RawPackageDescriptor::new("@brutal/foundation", "2.0.0");
        foundation.breaking = vec!["1.0.0".to_string()];
        let matrix = matrix::build(&[
            foundation,
            RawPackageDescriptor::new("@brutal/events", "1.0.0")
                .with_dependency("@brutal/foundation", "workspace:*"),
        ])
        .unwrap();
        let system = CompatibilitySystem::new(matrix, ValidationPolicy::default());

        let result = system.validate(&assignment(&[
            ("@brutal/foundation", "2.0.0"),
            ("@brutal/events", "1.0.0"),
        ]));

        assert!(result.valid);
        assert!(result.issues.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn suggestions_pass_validation_when_breaking_changes_are_declared() {
        let mut foundation = RawPackageDescriptor::new("@brutal/foundation", "1.5.0");
        foundation.breaking = vec!["1.2.0".to_string()];
        foundation.supported_versions = vec!["1.0.0".to_string()];
        let matrix = matrix::build(&[
            foundation,
            RawPackageDescriptor::new("@brutal/state", "1.0.0")
                .with_dependency("@brutal/foundation", "^1.0.0"),
        ])
        .unwrap();
        let system = CompatibilitySystem::new(matrix, ValidationPolicy::default());
        let mut input = assignment(&[
            ("@brutal/foundation", "2.0.0"),
            ("@brutal/state", "1.0.0"),
        ]);

        let result = system.validate(&input);
        assert!(!result.valid);
        assert_eq!(result.suggestions.len(), 1);

        let suggestion = &result.suggestions[0];
        input.insert(suggestion.package.clone(), suggestion.suggested_version.clone());
        let revalidated = system.validate(&input);

        assert!(revalidated.valid, "{:?}", revalidated.issues);
    }

    #[test]
    fn validate_is_idempotent() {
        let system = system(ValidationPolicy::default());
        let input = assignment(&[
            ("@brutal/foundation", "3.0.0"),
            ("@brutal/components", "1.0.0"),
            ("@brutal/unknown", "1.0.0"),
        ]);

        assert_eq!(system.validate(&input), system.validate(&input));
    }

    #[test]
    fn validate_specs_fails_fast_on_malformed_version() {
        let packages: IndexMap<String, String> = [
            ("@brutal/foundation".to_string(), "1.0.0".to_string()),
            ("@brutal/events".to_string(), "1.x".to_string()),
        ]
        .into_iter()
        .collect();

        assert!(
            system(ValidationPolicy::default())
                .validate_specs(&packages)
                .is_err()
        );
    }
}
