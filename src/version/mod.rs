//! Version and range primitives
//!
//! # Modules
//!
//! - [`semver`]: `Version` type with numeric ordering and pre-release flag
//! - [`range`]: `VersionSpec` parsing and `VersionRange` containment
//! - [`error`]: Parse errors for versions and ranges

pub mod error;
pub mod range;
pub mod semver;

pub use error::ParseError;
pub use range::{VersionRange, VersionSpec, parse_range};
pub use semver::Version;
