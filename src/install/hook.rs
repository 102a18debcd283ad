use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::config::HOOK_COMMAND;
use crate::install::DiscoveryError;

const HOOK_SCRIPTS: [&str; 2] = ["preinstall", "postinstall"];

/// New script value, or `None` when the command is already registered
fn with_hook(existing: Option<&str>) -> Option<String> {
    match existing {
        None | Some("") => Some(HOOK_COMMAND.to_string()),
        Some(script) if script.contains(HOOK_COMMAND) => None,
        Some(script) => Some(format!("{script} && {HOOK_COMMAND}")),
    }
}

/// Register the validator in the `preinstall` and `postinstall` scripts.
///
/// Existing scripts are chained with `&&`. Key order of the file is kept.
/// Returns the names of the scripts that changed; the file is only
/// rewritten when that list is non-empty.
pub fn install_hook(package_json: &Path) -> Result<Vec<&'static str>, DiscoveryError> {
    let content =
        fs::read_to_string(package_json).map_err(|e| DiscoveryError::io(package_json, e))?;
    let mut root: Value =
        serde_json::from_str(&content).map_err(|source| DiscoveryError::Json {
            path: package_json.to_path_buf(),
            source,
        })?;

    let Some(pkg) = root.as_object_mut() else {
        return Err(DiscoveryError::NotAnObject(package_json.to_path_buf()));
    };
    let scripts = pkg
        .entry("scripts")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(scripts) = scripts.as_object_mut() else {
        return Err(DiscoveryError::NotAnObject(package_json.to_path_buf()));
    };

    let mut changed = Vec::new();
    for name in HOOK_SCRIPTS {
        if let Some(script) = with_hook(scripts.get(name).and_then(Value::as_str)) {
            scripts.insert(name.to_string(), Value::String(script));
            changed.push(name);
        }
    }

    if !changed.is_empty() {
        let mut output = serde_json::to_string_pretty(&root).map_err(|source| {
            DiscoveryError::Json {
                path: package_json.to_path_buf(),
                source,
            }
        })?;
        output.push('\n');
        fs::write(package_json, output).map_err(|e| DiscoveryError::io(package_json, e))?;
        info!("Installed {} hook in {}", HOOK_COMMAND, package_json.display());
    }

    Ok(changed)
}
