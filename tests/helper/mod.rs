//! Workspace fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use tempfile::TempDir;

/// Temporary workspace with a `packages/@brutal` tree
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `packages/@brutal/<short>/package.json`
    pub fn package(self, name: &str, version: &str, dependencies: &[(&str, &str)]) -> Self {
        self.package_json(
            name,
            json!({
                "name": name,
                "version": version,
                "dependencies": deps(dependencies),
            }),
        )
    }

    pub fn package_json(self, name: &str, content: Value) -> Self {
        let short = name.trim_start_matches("@brutal/");
        let dir = self.root().join("packages/@brutal").join(short);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("package.json"),
            serde_json::to_string_pretty(&content).unwrap(),
        )
        .unwrap();
        self
    }

    /// Write `node_modules/@brutal/<short>/package.json`
    pub fn installed(self, name: &str, version: &str) -> Self {
        let short = name.trim_start_matches("@brutal/");
        let dir = self.root().join("node_modules/@brutal").join(short);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("package.json"),
            json!({ "name": name, "version": version }).to_string(),
        )
        .unwrap();
        self
    }
}

pub fn deps(pairs: &[(&str, &str)]) -> Value {
    Value::Object(
        pairs
            .iter()
            .map(|(name, spec)| (name.to_string(), Value::String(spec.to_string())))
            .collect(),
    )
}

/// foundation and events at 1.0.0, components depending on both with `^1.0.0`
pub fn component_workspace() -> Workspace {
    Workspace::new()
        .package("@brutal/foundation", "1.0.0", &[])
        .package("@brutal/events", "1.0.0", &[])
        .package(
            "@brutal/components",
            "1.0.0",
            &[
                ("@brutal/foundation", "^1.0.0"),
                ("@brutal/events", "^1.0.0"),
                ("lit", "^3.0.0"),
            ],
        )
}
