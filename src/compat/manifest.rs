//! Persisted manifest snapshot
//!
//! The JSON artifact written by `generate` and read back by the install-time
//! validator and the runtime guard.

use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compat::error::SnapshotError;
use crate::compat::matrix::CompatibilityMatrix;
use crate::compat::types::{BreakingChange, PackageManifest};
use crate::config::{MANIFEST_FORMAT_VERSION, ValidationPolicy};
use crate::version::VersionRange;

/// Per-version compatibility entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityEntry {
    pub compatible: IndexMap<String, VersionRange>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub incompatible: IndexMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub version: String,
    pub generated: DateTime<Utc>,
    pub packages: IndexMap<String, PackageManifest>,
    #[serde(default)]
    pub compatibility: IndexMap<String, IndexMap<String, CompatibilityEntry>>,
    #[serde(default)]
    pub breaking: Vec<BreakingChange>,
    #[serde(default)]
    pub validation: ValidationPolicy,
}

impl VersionManifest {
    pub fn from_matrix(
        matrix: &CompatibilityMatrix,
        generated: DateTime<Utc>,
        validation: ValidationPolicy,
    ) -> Self {
        let compatibility = matrix
            .packages()
            .iter()
            .map(|(name, pkg)| {
                let entry = CompatibilityEntry {
                    compatible: pkg.dependencies.clone(),
                    incompatible: IndexMap::new(),
                    notes: matrix.notes(name).map(str::to_string),
                };
                let mut versions = IndexMap::new();
                versions.insert(pkg.current_version.to_string(), entry);
                (name.clone(), versions)
            })
            .collect();

        Self {
            version: MANIFEST_FORMAT_VERSION.to_string(),
            generated,
            packages: matrix.packages().clone(),
            compatibility,
            breaking: matrix.breaking().to_vec(),
            validation,
        }
    }

    /// Rebuild the in-memory matrix this manifest was generated from
    pub fn to_matrix(&self) -> CompatibilityMatrix {
        let notes = self
            .packages
            .iter()
            .filter_map(|(name, pkg)| {
                let entry = self
                    .compatibility
                    .get(name)?
                    .get(&pkg.current_version.to_string())?;
                entry.notes.clone().map(|n| (name.clone(), n))
            })
            .collect();

        CompatibilityMatrix::from_parts(self.packages.clone(), self.breaking.clone(), notes)
    }

    pub fn from_json(content: &str) -> Result<Self, SnapshotError> {
        let mut manifest: VersionManifest = serde_json::from_str(content)?;
        for (name, pkg) in manifest.packages.iter_mut() {
            pkg.name = name.clone();
        }
        debug!(
            "Parsed manifest v{} with {} packages",
            manifest.version,
            manifest.packages.len()
        );
        Ok(manifest)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        info!("Loading compatibility manifest from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_json()?)?;
        info!("Saved compatibility matrix to {:?}", path);
        Ok(())
    }
}
