use thiserror::Error;

use crate::version::ParseError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid version for {package}: {source}")]
    InvalidVersion {
        package: String,
        #[source]
        source: ParseError,
    },

    #[error("Invalid range for {package} -> {dependency}: {source}")]
    InvalidRange {
        package: String,
        dependency: String,
        #[source]
        source: ParseError,
    },

    #[error("Package declared more than once: {0}")]
    DuplicatePackage(String),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
}
