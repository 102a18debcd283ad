//! Workspace -> manifest -> validation flow

mod helper;

use chrono::{TimeZone, Utc};
use indexmap::IndexMap;
use rstest::rstest;
use serde_json::Value;

use brutal_compat::compat::{
    CompatibilityIssue, CompatibilitySystem, CompatibilityWarning, VersionManifest, matrix,
};
use brutal_compat::config::ValidationPolicy;
use brutal_compat::install::{discover_installed, discover_workspace};
use brutal_compat::version::{Version, parse_range};

use helper::{Workspace, component_workspace};

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn assignment(pairs: &[(&str, &str)]) -> IndexMap<String, Version> {
    pairs
        .iter()
        .map(|(name, version)| (name.to_string(), v(version)))
        .collect()
}

fn system_for(workspace: &Workspace) -> CompatibilitySystem {
    let descriptors = discover_workspace(workspace.root()).unwrap();
    let matrix = matrix::build(&descriptors).unwrap();
    CompatibilitySystem::new(matrix, ValidationPolicy::default())
}

#[test]
fn consistent_assignment_is_valid() {
    let system = system_for(&component_workspace());

    let result = system.validate(&assignment(&[
        ("@brutal/foundation", "1.0.0"),
        ("@brutal/events", "1.0.0"),
        ("@brutal/components", "1.0.0"),
    ]));

    assert!(result.valid);
    assert!(result.issues.is_empty());
}

#[test]
fn major_bump_outside_caret_range_is_one_incompatible_issue() {
    let system = system_for(&component_workspace());

    let result = system.validate(&assignment(&[
        ("@brutal/foundation", "2.0.0"),
        ("@brutal/events", "1.0.0"),
        ("@brutal/components", "1.0.0"),
    ]));

    assert!(!result.valid);
    assert_eq!(result.issues.len(), 1);
    match &result.issues[0] {
        CompatibilityIssue::IncompatibleVersion {
            package,
            dependency,
            expected,
            actual,
            ..
        } => {
            assert_eq!(package, "@brutal/components");
            assert_eq!(dependency, "@brutal/foundation");
            assert_eq!(expected.to_string(), "[1.0.0, 2.0.0)");
            assert_eq!(actual, &v("2.0.0"));
        }
        other => panic!("expected incompatible version, got {other:?}"),
    }
}

#[test]
fn tilde_range_accepts_patches_only() {
    let range = parse_range("~1.2.3").unwrap();

    assert!(range.contains(&v("1.2.9")));
    assert!(!range.contains(&v("1.3.0")));
}

#[test]
fn unknown_package_is_a_warning_not_an_issue() {
    let system = system_for(&component_workspace());

    let result = system.validate(&assignment(&[
        ("@brutal/foundation", "1.0.0"),
        ("@brutal/router", "0.4.0"),
    ]));

    assert!(result.valid);
    assert!(result.issues.is_empty());
    assert_eq!(
        result.warnings,
        vec![CompatibilityWarning::UnknownPackage {
            package: "@brutal/router".to_string()
        }]
    );
}

#[rstest]
#[case("0.9.0")]
#[case("1.0.0")]
#[case("1.5.2")]
#[case("1.99.0-beta.1")]
#[case("2.0.0")]
#[case("3.1.0")]
fn valid_results_only_contain_in_range_pairs(#[case] foundation: &str) {
    let system = system_for(&component_workspace());
    let input = assignment(&[
        ("@brutal/foundation", foundation),
        ("@brutal/events", "1.0.0"),
        ("@brutal/components", "1.0.0"),
    ]);

    let result = system.validate(&input);

    let range = system
        .matrix()
        .range("@brutal/components", "@brutal/foundation")
        .unwrap();
    let in_range = range.contains(&input["@brutal/foundation"]);
    assert_eq!(result.valid, in_range);
    let incompatible = result
        .issues
        .iter()
        .filter(|i| matches!(i, CompatibilityIssue::IncompatibleVersion { .. }))
        .count();
    assert_eq!(incompatible, usize::from(!in_range));
}

#[test]
fn suggested_versions_pass_validation() {
    let workspace = Workspace::new()
        .package_json(
            "@brutal/foundation",
            serde_json::json!({
                "name": "@brutal/foundation",
                "version": "2.0.0",
                "brutal": { "supportedVersions": ["1.0.0", "1.3.0"] }
            }),
        )
        .package("@brutal/events", "1.0.0", &[("@brutal/foundation", "^1.0.0")])
        .package("@brutal/state", "1.0.0", &[("@brutal/foundation", "~1.3.0")]);
    let system = system_for(&workspace);
    let mut input = assignment(&[
        ("@brutal/foundation", "2.0.0"),
        ("@brutal/events", "1.0.0"),
        ("@brutal/state", "1.0.0"),
    ]);

    let result = system.validate(&input);

    assert_eq!(result.issues.len(), 2);
    assert_eq!(result.suggestions.len(), 1);
    assert_eq!(result.suggestions[0].package, "@brutal/foundation");
    assert_eq!(result.suggestions[0].suggested_version, v("1.3.0"));

    input.insert(
        "@brutal/foundation".to_string(),
        result.suggestions[0].suggested_version.clone(),
    );
    assert!(system.validate(&input).valid);
}

#[test]
fn saved_manifest_validates_like_the_built_matrix() {
    let workspace = component_workspace();
    let descriptors = discover_workspace(workspace.root()).unwrap();
    let matrix = matrix::build(&descriptors).unwrap();
    let generated = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let manifest = VersionManifest::from_matrix(&matrix, generated, ValidationPolicy::default());
    let path = workspace.root().join("compatibility-matrix.json");

    manifest.save(&path).unwrap();
    let loaded = VersionManifest::load(&path).unwrap();

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let range = &raw["packages"]["@brutal/components"]["dependencies"]["@brutal/foundation"];
    assert_eq!(range["min"], "1.0.0");
    assert_eq!(range["max"], "2.0.0");
    assert_eq!(range["exclusiveMax"], true);
    assert!(raw["packages"]["@brutal/components"]["dependencies"]["lit"].is_null());

    let input = assignment(&[
        ("@brutal/foundation", "2.0.0"),
        ("@brutal/components", "1.0.0"),
    ]);
    let built = CompatibilitySystem::new(matrix, ValidationPolicy::default());
    assert_eq!(
        CompatibilitySystem::from_manifest(&loaded).validate(&input),
        built.validate(&input)
    );
}

#[test]
fn installed_packages_validate_through_raw_versions() {
    let workspace = component_workspace()
        .installed("@brutal/foundation", "1.2.0")
        .installed("@brutal/events", "1.0.0")
        .installed("@brutal/components", "1.0.0");
    let system = system_for(&workspace);

    let installed = discover_installed(workspace.root()).unwrap();
    let result = system.validate_specs(&installed).unwrap();

    assert_eq!(installed.len(), 3);
    assert!(result.valid);
}
