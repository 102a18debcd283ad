//! Installed-version lookup used by the runtime guard

#[cfg(test)]
use mockall::automock;

use indexmap::IndexMap;

use crate::compat::manifest::VersionManifest;
use crate::version::Version;

/// Source of versions for packages loaded in the current process
#[cfg_attr(test, automock)]
pub trait InstalledVersions: Send + Sync + 'static {
    /// Version of `package` currently loaded, if any
    fn installed_version(&self, package: &str) -> Option<Version>;
}

/// Answers with each package's current version from a snapshot
#[derive(Debug, Clone, Default)]
pub struct SnapshotVersions {
    versions: IndexMap<String, Version>,
}

impl SnapshotVersions {
    pub fn from_manifest(manifest: &VersionManifest) -> Self {
        let versions = manifest
            .packages
            .iter()
            .map(|(name, pkg)| (name.clone(), pkg.current_version.clone()))
            .collect();
        Self { versions }
    }
}

impl InstalledVersions for SnapshotVersions {
    fn installed_version(&self, package: &str) -> Option<Version> {
        self.versions.get(package).cloned()
    }
}
