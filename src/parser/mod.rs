//! Manifest parsing layer
//!
//! Turns `package.json` content into [`types::RawPackageDescriptor`] values
//! for the matrix builder.

pub mod package_json;
pub mod types;
