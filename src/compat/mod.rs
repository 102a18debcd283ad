//! Compatibility resolution layer
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   parser    │────▶│   matrix    │────▶│  manifest   │
//! │(package.json)│    │  (builder)  │     │ (snapshot)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   │
//!                            ▼                   ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │  validator  │────▶│   suggest   │
//!                     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │   report    │
//!                     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`matrix`]: Builds package -> dependency -> range relationships
//! - [`manifest`]: Persisted JSON snapshot of the matrix
//! - [`validator`]: Checks version assignments against the matrix
//! - [`suggest`]: Proposes versions that resolve incompatibilities
//! - [`report`]: Pairwise view, recommendations, text and HTML output
//! - [`types`]: Issues, warnings, suggestions and validation results
//! - [`error`]: Build and snapshot errors

pub mod error;
pub mod manifest;
pub mod matrix;
pub mod report;
pub mod suggest;
pub mod types;
pub mod validator;

pub use manifest::VersionManifest;
pub use matrix::CompatibilityMatrix;
pub use types::{
    BreakingChange, CompatibilityIssue, CompatibilityWarning, PackageManifest, Suggestion,
    UnresolvedConflict, ValidationResult,
};
pub use validator::CompatibilitySystem;
