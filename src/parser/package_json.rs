//! package.json reader
//!
//! Extracts the fields the compatibility tooling needs: name, version,
//! dependency specs and the optional `brutal.compatibility` block.

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::parser::types::{ManifestError, RawPackageDescriptor};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: IndexMap<String, String>,
    #[serde(default)]
    peer_dependencies: IndexMap<String, String>,
    #[serde(default)]
    brutal: Option<BrutalSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrutalSection {
    #[serde(default)]
    compatibility: CompatibilitySection,
    #[serde(default)]
    supported_versions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CompatibilitySection {
    #[serde(default)]
    tested: Vec<String>,
    #[serde(default)]
    breaking: Vec<String>,
}

/// Parse the content of a package.json file
pub fn parse(content: &str) -> Result<RawPackageDescriptor, ManifestError> {
    let pkg: PackageJson = serde_json::from_str(content)?;

    if pkg.name.trim().is_empty() {
        return Err(ManifestError::MissingField("name"));
    }
    if pkg.version.trim().is_empty() {
        return Err(ManifestError::MissingField("version"));
    }

    // peerDependencies override a same-named regular entry in place
    let mut dependencies = pkg.dependencies;
    for (name, spec) in pkg.peer_dependencies {
        dependencies.insert(name, spec);
    }

    let brutal = pkg.brutal.unwrap_or_default();
    debug!(
        "Parsed {}@{} with {} dependencies",
        pkg.name,
        pkg.version,
        dependencies.len()
    );

    Ok(RawPackageDescriptor {
        name: pkg.name,
        version: pkg.version,
        dependencies,
        tested: brutal.compatibility.tested,
        breaking: brutal.compatibility.breaking,
        supported_versions: brutal.supported_versions,
    })
}
