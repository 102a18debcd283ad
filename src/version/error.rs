use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty version string")]
    Empty,

    #[error("Invalid version {input:?}: {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("Unsupported version range {0:?}")]
    UnsupportedRange(String),

    #[error("Invalid range {input:?}: minimum {min} is greater than maximum {max}")]
    InvertedRange {
        input: String,
        min: String,
        max: String,
    },
}
