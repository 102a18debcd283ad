//! Filesystem side of the install-time validator
//!
//! # Modules
//!
//! - [`discovery`]: Reads workspace and installed `@brutal` packages
//! - [`hook`]: Registers the validator in `package.json` scripts

pub mod discovery;
pub mod hook;

use std::path::PathBuf;

use crate::parser::types::ManifestError;

pub use discovery::{discover_installed, discover_workspace, find_node_modules};
pub use hook::install_hook;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid package manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} is not a JSON object")]
    NotAnObject(PathBuf),
}

impl DiscoveryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
