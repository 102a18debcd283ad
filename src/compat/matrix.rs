//! Compatibility matrix builder
//!
//! Resolves every declared intra-ecosystem dependency of every package into
//! a [`VersionRange`]. Output order follows declaration order, so building
//! the same descriptors twice yields identical matrices.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::compat::error::BuildError;
use crate::compat::types::{BreakingChange, PackageManifest};
use crate::parser::types::RawPackageDescriptor;
use crate::version::{Version, VersionRange, parse_range};

/// Package -> dependency -> range relationships for a known package set
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompatibilityMatrix {
    packages: IndexMap<String, PackageManifest>,
    breaking: Vec<BreakingChange>,
    notes: IndexMap<String, String>,
}

impl CompatibilityMatrix {
    pub fn from_parts(
        packages: IndexMap<String, PackageManifest>,
        breaking: Vec<BreakingChange>,
        notes: IndexMap<String, String>,
    ) -> Self {
        Self {
            packages,
            breaking,
            notes,
        }
    }

    pub fn package(&self, name: &str) -> Option<&PackageManifest> {
        self.packages.get(name)
    }

    pub fn packages(&self) -> &IndexMap<String, PackageManifest> {
        &self.packages
    }

    pub fn breaking(&self) -> &[BreakingChange] {
        &self.breaking
    }

    pub fn notes(&self, name: &str) -> Option<&str> {
        self.notes.get(name).map(String::as_str)
    }

    /// Range `package` declares for `dependency`
    pub fn range(&self, package: &str, dependency: &str) -> Option<&VersionRange> {
        self.packages.get(package)?.dependencies.get(dependency)
    }
}

struct KnownPackage<'a> {
    descriptor: &'a RawPackageDescriptor,
    version: Version,
    breaking_from: Vec<Version>,
}

/// Build the matrix from raw package declarations.
///
/// Any unparseable version or range aborts the build: a matrix built from
/// partially understood declarations cannot be trusted.
pub fn build(descriptors: &[RawPackageDescriptor]) -> Result<CompatibilityMatrix, BuildError> {
    info!("Building compatibility matrix for {} packages", descriptors.len());

    let mut known: IndexMap<&str, KnownPackage> = IndexMap::new();
    for descriptor in descriptors {
        if known.contains_key(descriptor.name.as_str()) {
            return Err(BuildError::DuplicatePackage(descriptor.name.clone()));
        }
        let version = parse_version(&descriptor.name, &descriptor.version)?;
        let breaking_from = descriptor
            .breaking
            .iter()
            .map(|v| parse_version(&descriptor.name, v))
            .collect::<Result<Vec<_>, _>>()?;
        known.insert(
            &descriptor.name,
            KnownPackage {
                descriptor,
                version,
                breaking_from,
            },
        );
    }

    let mut packages = IndexMap::new();
    let mut notes = IndexMap::new();
    for pkg in known.values() {
        let manifest = build_package(pkg, &known)?;
        notes.insert(
            manifest.name.clone(),
            package_notes(&pkg.version, manifest.dependencies.len()),
        );
        packages.insert(manifest.name.clone(), manifest);
    }

    let breaking = breaking_changes(&known);
    debug!("Collected {} breaking change records", breaking.len());

    Ok(CompatibilityMatrix {
        packages,
        breaking,
        notes,
    })
}

fn build_package(
    pkg: &KnownPackage,
    known: &IndexMap<&str, KnownPackage>,
) -> Result<PackageManifest, BuildError> {
    let name = &pkg.descriptor.name;
    let declared_tested = pkg
        .descriptor
        .tested
        .iter()
        .map(|v| parse_version(name, v))
        .collect::<Result<Vec<_>, _>>()?;

    let mut dependencies = IndexMap::new();
    for (dep_name, spec) in &pkg.descriptor.dependencies {
        let Some(dep) = known.get(dep_name.as_str()) else {
            debug!("Skipping {} -> {}: not part of the package set", name, dep_name);
            continue;
        };

        let range = parse_range(spec).map_err(|source| BuildError::InvalidRange {
            package: name.clone(),
            dependency: dep_name.clone(),
            source,
        })?;

        let tested = if declared_tested.is_empty() {
            vec![dep.version.clone()]
        } else {
            declared_tested.clone()
        };
        let breaking = breaking_releases_within(dep, &range);

        dependencies.insert(
            dep_name.clone(),
            range.with_tested(tested).with_breaking(breaking),
        );
    }

    let mut supported_versions = Vec::new();
    for raw in &pkg.descriptor.supported_versions {
        let version = parse_version(name, raw)?;
        if !supported_versions.contains(&version) {
            supported_versions.push(version);
        }
    }
    if !supported_versions.contains(&pkg.version) {
        supported_versions.push(pkg.version.clone());
    }

    debug!(
        "Resolved {}@{} with {} ecosystem dependencies",
        name,
        pkg.version,
        dependencies.len()
    );

    Ok(PackageManifest {
        name: name.clone(),
        current_version: pkg.version.clone(),
        supported_versions,
        dependencies,
    })
}

/// A package that declares breaking changes breaks at its current version.
/// Wildcard consumers accept any version and never record one.
fn breaking_releases_within(dep: &KnownPackage, range: &VersionRange) -> Vec<Version> {
    if dep.breaking_from.is_empty() || range.same_bounds(&VersionRange::widest()) {
        return Vec::new();
    }
    if dep.version.core() > range.min.core() && range.contains(&dep.version) {
        vec![dep.version.clone()]
    } else {
        Vec::new()
    }
}

fn breaking_changes(known: &IndexMap<&str, KnownPackage>) -> Vec<BreakingChange> {
    known
        .values()
        .flat_map(|pkg| {
            let name = &pkg.descriptor.name;
            pkg.breaking_from.iter().map(move |from| BreakingChange {
                package: name.clone(),
                from_version: from.clone(),
                to_version: pkg.version.clone(),
                changes: vec![format!("Breaking changes from {} to {}", from, pkg.version)],
                migration_guide: Some(format!(
                    "/docs/migration/{}-{}-to-{}.md",
                    name, from, pkg.version
                )),
                codemod: None,
            })
        })
        .collect()
}

fn package_notes(version: &Version, dependency_count: usize) -> String {
    let mut notes = Vec::new();

    if version.is_prerelease() {
        notes.push("Pre-release version - use with caution".to_string());
    }

    match dependency_count {
        0 => notes.push("No ecosystem dependencies - base package".to_string()),
        1 => notes.push("Single dependency - follows one-dependency rule".to_string()),
        n => notes.push(format!("Warning: {n} ecosystem dependencies")),
    }

    notes.join("; ")
}

fn parse_version(package: &str, raw: &str) -> Result<Version, BuildError> {
    Version::parse(raw).map_err(|source| BuildError::InvalidVersion {
        package: package.to_string(),
        source,
    })
}
