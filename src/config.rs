use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// =============================================================================
// Version constants
// =============================================================================

/// Upper bound of the widest range (`*`, `workspace:*`)
pub const WIDEST_MAX: (u64, u64, u64) = (999, 999, 999);

/// Format version written into generated manifests
pub const MANIFEST_FORMAT_VERSION: &str = "1.0.0";

// =============================================================================
// Workspace layout
// =============================================================================

/// npm scope shared by every ecosystem package
pub const PACKAGE_SCOPE: &str = "@brutal";

/// Directory (relative to the workspace root) holding the scoped packages
pub const PACKAGES_DIR: &str = "packages";

/// Default file name of the generated manifest
pub const MANIFEST_FILE_NAME: &str = "compatibility-matrix.json";

/// Default file name of the HTML matrix report
pub const HTML_REPORT_FILE_NAME: &str = "compatibility-matrix.html";

/// Script name registered in `preinstall`/`postinstall` hooks
pub const HOOK_COMMAND: &str = "brutal-validate-compatibility";

/// Prefix used by the runtime guard in user-facing messages
pub const GUARD_PREFIX: &str = "[BRUTAL Version Guard]";

/// Validation behavior recorded in a manifest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationPolicy {
    /// Fail installs when incompatibilities are found
    pub strict: bool,
    /// Accept pre-release versions without a warning
    pub allow_prerelease: bool,
    /// Run the runtime guard when packages load
    pub enforce_at_runtime: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            strict: true,
            allow_prerelease: false,
            enforce_at_runtime: true,
        }
    }
}

/// Returns the path to the data directory for brutal-compat.
/// Uses $XDG_DATA_HOME/brutal-compat if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/brutal-compat,
/// or ./brutal-compat if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the directory for log files.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("brutal-compat")
}

/// Whether a dependency name belongs to the ecosystem scope
pub fn is_scoped(name: &str) -> bool {
    name.strip_prefix(PACKAGE_SCOPE)
        .is_some_and(|rest| rest.starts_with('/'))
}
