//! Compatibility reports
//!
//! Pairwise compatibility view, affected breaking changes and
//! recommendations, plus the console and HTML renderings.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::compat::manifest::VersionManifest;
use crate::compat::matrix::CompatibilityMatrix;
use crate::compat::types::{BreakingChange, CompatibilityIssue, Suggestion, ValidationResult};
use crate::compat::validator::CompatibilitySystem;
use crate::config::PACKAGE_SCOPE;
use crate::version::Version;

/// More incompatible cells than this triggers the "upgrade together" advice
const INCOMPATIBLE_PAIR_THRESHOLD: usize = 5;

const SEPARATOR_WIDTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PairStatus {
    Compatible,
    Incompatible,
    Unknown,
    #[serde(rename = "self")]
    SamePackage,
}

impl PairStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairStatus::Compatible => "compatible",
            PairStatus::Incompatible => "incompatible",
            PairStatus::Unknown => "unknown",
            PairStatus::SamePackage => "self",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixView {
    pub packages: Vec<String>,
    pub compatibility: IndexMap<String, IndexMap<String, PairStatus>>,
}

impl MatrixView {
    pub fn count(&self, status: PairStatus) -> usize {
        self.compatibility
            .values()
            .flat_map(|row| row.values())
            .filter(|s| **s == status)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub timestamp: DateTime<Utc>,
    pub packages: IndexMap<String, Version>,
    pub validation: ValidationResult,
    pub matrix: MatrixView,
    pub breaking: Vec<BreakingChange>,
    pub recommendations: Vec<String>,
}

impl CompatibilitySystem {
    pub fn report(
        &self,
        assignment: &IndexMap<String, Version>,
        timestamp: DateTime<Utc>,
    ) -> CompatibilityReport {
        let validation = self.validate(assignment);
        let matrix = matrix_view(self.matrix(), assignment);
        let breaking = affected_breaking_changes(self.matrix(), assignment);
        let recommendations = recommendations(&validation, &matrix);

        CompatibilityReport {
            timestamp,
            packages: assignment.clone(),
            validation,
            matrix,
            breaking,
            recommendations,
        }
    }
}

fn matrix_view(matrix: &CompatibilityMatrix, assignment: &IndexMap<String, Version>) -> MatrixView {
    let packages: Vec<String> = assignment.keys().cloned().collect();
    let compatibility = assignment
        .iter()
        .map(|(a, version_a)| {
            let row = assignment
                .iter()
                .map(|(b, version_b)| {
                    let status = if a == b {
                        PairStatus::SamePackage
                    } else {
                        pair_status(matrix, (a.as_str(), version_a), (b.as_str(), version_b))
                    };
                    (b.clone(), status)
                })
                .collect();
            (a.clone(), row)
        })
        .collect();

    MatrixView {
        packages,
        compatibility,
    }
}

/// Compatibility of two assigned packages in either dependency direction
fn pair_status(
    matrix: &CompatibilityMatrix,
    (a, version_a): (&str, &Version),
    (b, version_b): (&str, &Version),
) -> PairStatus {
    if matrix.package(a).is_none() || matrix.package(b).is_none() {
        return PairStatus::Unknown;
    }

    let a_rejects_b = matrix
        .range(a, b)
        .is_some_and(|range| !range.contains(version_b));
    let b_rejects_a = matrix
        .range(b, a)
        .is_some_and(|range| !range.contains(version_a));

    if a_rejects_b || b_rejects_a {
        PairStatus::Incompatible
    } else {
        PairStatus::Compatible
    }
}

fn affected_breaking_changes(
    matrix: &CompatibilityMatrix,
    assignment: &IndexMap<String, Version>,
) -> Vec<BreakingChange> {
    matrix
        .breaking()
        .iter()
        .filter(|change| {
            assignment
                .get(&change.package)
                .is_some_and(|version| change.affects(version))
        })
        .cloned()
        .collect()
}

fn recommendations(validation: &ValidationResult, matrix: &MatrixView) -> Vec<String> {
    let mut recommendations = Vec::new();

    if !validation.valid {
        recommendations.push(
            "Consider using the suggested versions to resolve compatibility issues".to_string(),
        );
    }

    if matrix.count(PairStatus::Incompatible) > INCOMPATIBLE_PAIR_THRESHOLD {
        recommendations.push(
            "Many incompatibilities detected. Consider upgrading all packages together."
                .to_string(),
        );
    }

    recommendations
}

/// Package manager detected from `npm_config_user_agent`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Pnpm,
    Yarn,
}

impl PackageManager {
    pub fn from_user_agent(user_agent: &str) -> Self {
        if user_agent.contains("pnpm") {
            PackageManager::Pnpm
        } else if user_agent.contains("yarn") {
            PackageManager::Yarn
        } else {
            PackageManager::Npm
        }
    }

    fn add_command(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm install",
            PackageManager::Pnpm => "pnpm add",
            PackageManager::Yarn => "yarn add",
        }
    }
}

/// Command installing every suggested version, if there are any
pub fn install_command(suggestions: &[Suggestion], manager: PackageManager) -> Option<String> {
    if suggestions.is_empty() {
        return None;
    }
    let packages: Vec<String> = suggestions
        .iter()
        .map(|s| format!("{}@{}", s.package, s.suggested_version))
        .collect();
    Some(format!("{} {}", manager.add_command(), packages.join(" ")))
}

/// Console view of an install-time validation
pub fn render_text(
    result: &ValidationResult,
    installed: &IndexMap<String, Version>,
    strict: bool,
    manager: PackageManager,
) -> String {
    TextView {
        result,
        installed,
        strict,
        manager,
    }
    .to_string()
}

struct TextView<'a> {
    result: &'a ValidationResult,
    installed: &'a IndexMap<String, Version>,
    strict: bool,
    manager: PackageManager,
}

impl fmt::Display for TextView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        let separator = "─".repeat(SEPARATOR_WIDTH);

        writeln!(f, "\nCompatibility Check Results:")?;
        writeln!(f, "{separator}")?;

        writeln!(f, "\nInstalled packages:")?;
        for (name, version) in self.installed {
            writeln!(f, "   {name}@{version}")?;
        }

        if !result.warnings.is_empty() {
            writeln!(f, "\nWarnings:")?;
            for warning in &result.warnings {
                writeln!(f, "   - {warning}")?;
            }
        }

        if !result.issues.is_empty() {
            writeln!(f, "\nCompatibility Issues:")?;
            for issue in &result.issues {
                writeln!(f, "\n   {}:", issue.package())?;
                writeln!(f, "   - {issue}")?;
                if let CompatibilityIssue::IncompatibleVersion {
                    expected, actual, ..
                } = issue
                {
                    writeln!(f, "   - Expected: {expected}")?;
                    writeln!(f, "   - Actual: {actual}")?;
                }
            }
        }

        if !result.suggestions.is_empty() {
            writeln!(f, "\nSuggestions:")?;
            for suggestion in &result.suggestions {
                writeln!(
                    f,
                    "   - Install {}@{}",
                    suggestion.package, suggestion.suggested_version
                )?;
                writeln!(f, "     Reason: {}", suggestion.reason)?;
            }
            if let Some(command) = install_command(&result.suggestions, self.manager) {
                writeln!(f, "\nTo fix, run:")?;
                writeln!(f, "   {command}")?;
            }
        }

        if !result.unresolved.is_empty() {
            writeln!(f, "\nUnresolved conflicts (no suggestion available):")?;
            for conflict in &result.unresolved {
                writeln!(f, "   - {conflict}")?;
            }
        }

        writeln!(f, "\n{separator}")?;
        if result.valid {
            return writeln!(f, "All packages are compatible!");
        }
        writeln!(f, "Compatibility issues detected!")?;
        if self.strict {
            writeln!(f, "Installation blocked due to strict validation mode.")?;
            writeln!(f, "   Fix the issues above or disable strict mode.")
        } else {
            writeln!(f, "Proceeding with installation despite issues.")?;
            writeln!(f, "   Fix the compatibility issues to avoid runtime errors.")
        }
    }
}

fn short_name(name: &str) -> &str {
    name.strip_prefix(PACKAGE_SCOPE)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name)
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Status of `a`'s declared range for `b` at `b`'s current version
fn manifest_pair_status(manifest: &VersionManifest, a: &str, b: &str) -> PairStatus {
    let (Some(pkg_a), Some(pkg_b)) = (manifest.packages.get(a), manifest.packages.get(b)) else {
        return PairStatus::Unknown;
    };
    match pkg_a.dependencies.get(b) {
        None => PairStatus::Unknown,
        Some(range) if range.contains(&pkg_b.current_version) => PairStatus::Compatible,
        Some(_) => PairStatus::Incompatible,
    }
}

const HTML_STYLE: &str = "\
    body { font-family: system-ui; margin: 20px; }
    h1 { color: #333; }
    .matrix { overflow-x: auto; }
    table { border-collapse: collapse; font-size: 12px; }
    th, td { border: 1px solid #ddd; padding: 8px; text-align: center; }
    th { background: #f5f5f5; position: sticky; top: 0; }
    .compatible { background: #d4edda; color: #155724; }
    .incompatible { background: #f8d7da; color: #721c24; }
    .unknown { background: #fff3cd; color: #856404; }
    .self { background: #e9ecef; color: #495057; }
    .package-name { text-align: left; font-weight: bold; }
    .stats, .breaking { margin: 20px 0; padding: 15px; border-radius: 5px; }
    .stats { background: #f8f9fa; }
    .breaking { background: #fff3cd; }
    .legend span { margin-right: 15px; padding: 2px 8px; border-radius: 3px; }";

/// HTML page showing the manifest's package-by-package matrix
pub fn render_html(manifest: &VersionManifest) -> String {
    HtmlView(manifest).to_string()
}

struct HtmlView<'a>(&'a VersionManifest);

impl fmt::Display for HtmlView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let manifest = self.0;
        let names: Vec<&String> = manifest.packages.keys().collect();

        writeln!(f, "<!DOCTYPE html>\n<html>\n<head>")?;
        writeln!(f, "  <title>BRUTAL Compatibility Matrix</title>")?;
        writeln!(f, "  <style>\n{HTML_STYLE}\n  </style>\n</head>\n<body>")?;
        writeln!(f, "  <h1>BRUTAL Compatibility Matrix</h1>")?;
        writeln!(f, "  <p>Generated: {}</p>", manifest.generated.to_rfc3339())?;

        writeln!(f, "  <div class=\"stats\">\n    <h3>Summary</h3>")?;
        writeln!(f, "    <p>Total Packages: {}</p>", names.len())?;
        writeln!(f, "    <p>Breaking Changes: {}</p>", manifest.breaking.len())?;
        let mode = if manifest.validation.strict {
            "Strict"
        } else {
            "Lenient"
        };
        writeln!(f, "    <p>Validation Mode: {mode}</p>\n  </div>")?;

        writeln!(f, "  <div class=\"legend\">\n    <h3>Legend</h3>")?;
        for (class, label) in [
            ("compatible", "Compatible"),
            ("incompatible", "Incompatible"),
            ("unknown", "Unknown"),
            ("self", "Same Package"),
        ] {
            writeln!(f, "    <span class=\"{class}\">{label}</span>")?;
        }
        writeln!(f, "  </div>")?;

        writeln!(f, "  <div class=\"matrix\">\n    <h3>Package Compatibility</h3>")?;
        writeln!(f, "    <table>\n      <thead>\n        <tr>\n          <th>Package</th>")?;
        for name in &names {
            writeln!(f, "          <th>{}</th>", escape_html(short_name(name)))?;
        }
        writeln!(f, "        </tr>\n      </thead>\n      <tbody>")?;
        for a in &names {
            write!(
                f,
                "        <tr><td class=\"package-name\">{}</td>",
                escape_html(short_name(a))
            )?;
            for b in &names {
                if a == b {
                    write!(f, "<td class=\"self\">-</td>")?;
                } else {
                    let status = manifest_pair_status(manifest, a, b).as_str();
                    write!(f, "<td class=\"{status}\">{status}</td>")?;
                }
            }
            writeln!(f, "</tr>")?;
        }
        writeln!(f, "      </tbody>\n    </table>\n  </div>")?;

        if !manifest.breaking.is_empty() {
            writeln!(f, "  <div class=\"breaking\">\n    <h3>Breaking Changes</h3>\n    <ul>")?;
            for change in &manifest.breaking {
                write!(
                    f,
                    "      <li><strong>{}</strong>: {} &rarr; {}",
                    escape_html(&change.package),
                    change.from_version,
                    change.to_version
                )?;
                if let Some(guide) = &change.migration_guide {
                    write!(f, " <a href=\"{}\">Migration Guide</a>", escape_html(guide))?;
                }
                writeln!(f, "</li>")?;
            }
            writeln!(f, "    </ul>\n  </div>")?;
        }

        writeln!(f, "</body>\n</html>")
    }
}
