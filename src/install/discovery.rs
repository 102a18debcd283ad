use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::{PACKAGE_SCOPE, PACKAGES_DIR, is_scoped};
use crate::install::DiscoveryError;
use crate::parser::package_json;
use crate::parser::types::RawPackageDescriptor;

const PACKAGE_JSON: &str = "package.json";

/// Package directories directly under `scope_dir`, sorted by name
fn package_dirs(scope_dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let entries = fs::read_dir(scope_dir).map_err(|e| DiscoveryError::io(scope_dir, e))?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn read_descriptor(package_dir: &Path) -> Result<RawPackageDescriptor, DiscoveryError> {
    let path = package_dir.join(PACKAGE_JSON);
    let content = fs::read_to_string(&path).map_err(|e| DiscoveryError::io(&path, e))?;
    package_json::parse(&content).map_err(|source| DiscoveryError::Manifest { path, source })
}

/// Read every `packages/@brutal/*/package.json` under `root`.
///
/// Packages whose manifest is missing or malformed are skipped with a
/// warning; only a missing scope directory is an error.
pub fn discover_workspace(root: &Path) -> Result<Vec<RawPackageDescriptor>, DiscoveryError> {
    let scope_dir = root.join(PACKAGES_DIR).join(PACKAGE_SCOPE);
    let mut descriptors = Vec::new();

    for dir in package_dirs(&scope_dir)? {
        match read_descriptor(&dir) {
            Ok(descriptor) => {
                debug!("Found {}@{}", descriptor.name, descriptor.version);
                descriptors.push(descriptor);
            }
            Err(e) => warn!("Skipping {}: {}", dir.display(), e),
        }
    }

    info!(
        "Discovered {} packages in {}",
        descriptors.len(),
        scope_dir.display()
    );
    Ok(descriptors)
}

/// Nearest `node_modules` directory at or above `start`
pub fn find_node_modules(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join("node_modules"))
        .find(|candidate| candidate.is_dir())
}

/// Versions of the `@brutal` packages installed in the nearest `node_modules`.
///
/// Returns an empty map when no `node_modules` or no scope directory exists.
pub fn discover_installed(start: &Path) -> Result<IndexMap<String, String>, DiscoveryError> {
    let mut installed = IndexMap::new();

    let Some(node_modules) = find_node_modules(start) else {
        warn!("Could not find node_modules above {}", start.display());
        return Ok(installed);
    };

    let scope_dir = node_modules.join(PACKAGE_SCOPE);
    if !scope_dir.is_dir() {
        debug!("No {} packages in {}", PACKAGE_SCOPE, node_modules.display());
        return Ok(installed);
    }

    for dir in package_dirs(&scope_dir)? {
        match read_descriptor(&dir) {
            Ok(descriptor) if is_scoped(&descriptor.name) => {
                debug!("Found {}@{}", descriptor.name, descriptor.version);
                installed.insert(descriptor.name, descriptor.version);
            }
            Ok(descriptor) => debug!("Ignoring unscoped package {}", descriptor.name),
            Err(e) => debug!("Skipping {}: {}", dir.display(), e),
        }
    }

    Ok(installed)
}
