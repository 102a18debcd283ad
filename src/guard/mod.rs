//! Runtime version guard
//!
//! Checks a package's own dependency set when it is loaded, against versions
//! already loaded in the process and an embedded manifest snapshot. Each
//! `name@version` pair is validated once per guard; `clear_cache` resets it.
//!
//! # Modules
//!
//! - [`lookup`]: `InstalledVersions` trait and the snapshot-backed default

pub mod lookup;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::compat::error::SnapshotError;
use crate::compat::manifest::VersionManifest;
use crate::config::GUARD_PREFIX;
use crate::version::{ParseError, Version, VersionRange, parse_range};

pub use lookup::{InstalledVersions, SnapshotVersions};

/// Manifest snapshot baked in at build time
const EMBEDDED_SNAPSHOT: &str = include_str!("../../data/embedded-manifest.json");

/// How violations are surfaced
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// Fail validation on the first violation
    Strict,
    /// Log violations and continue
    #[default]
    Warn,
    /// Record violations in the guard's diagnostics only
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOptions {
    pub package_name: String,
    pub package_version: String,
    /// Dependency name -> range spec
    pub dependencies: IndexMap<String, String>,
    pub mode: GuardMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionErrorKind {
    Missing,
    Incompatible,
    InvalidSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionError {
    pub kind: VersionErrorKind,
    pub package: String,
    pub dependency: Option<String>,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionWarningKind {
    Prerelease,
    Untested,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionWarning {
    pub kind: VersionWarningKind,
    pub package: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "data", rename_all = "lowercase")]
pub enum DiagnosticEntry {
    Error(VersionError),
    Warning(VersionWarning),
}

/// Violation recorded in silent mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: DiagnosticEntry,
}

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("{} {}", GUARD_PREFIX, .0.message)]
    Violation(VersionError),

    #[error("Failed to acquire guard state lock")]
    LockPoisoned,

    #[error("Invalid embedded snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

type ErrorHandler = Box<dyn Fn(&VersionError) + Send + Sync>;
type WarningHandler = Box<dyn Fn(&VersionWarning) + Send + Sync>;

#[derive(Default)]
struct GuardState {
    validated: HashSet<String>,
    installed: HashMap<String, Version>,
    diagnostics: Vec<Diagnostic>,
}

/// Where a checked range came from
struct DependencyCheck<'a> {
    name: &'a str,
    requirement: String,
    range: Result<VersionRange, ParseError>,
    from_snapshot: bool,
}

pub struct RuntimeGuard<L: InstalledVersions = SnapshotVersions> {
    snapshot: VersionManifest,
    lookup: L,
    state: Mutex<GuardState>,
    on_error: Option<ErrorHandler>,
    on_warn: Option<WarningHandler>,
}

impl RuntimeGuard<SnapshotVersions> {
    /// Guard backed by the snapshot compiled into this binary
    pub fn embedded() -> Result<Self, GuardError> {
        Ok(Self::new(VersionManifest::from_json(EMBEDDED_SNAPSHOT)?))
    }

    /// Guard that treats the snapshot's current versions as installed
    pub fn new(snapshot: VersionManifest) -> Self {
        let lookup = SnapshotVersions::from_manifest(&snapshot);
        Self::with_lookup(snapshot, lookup)
    }
}

impl<L: InstalledVersions> RuntimeGuard<L> {
    pub fn with_lookup(snapshot: VersionManifest, lookup: L) -> Self {
        Self {
            snapshot,
            lookup,
            state: Mutex::new(GuardState::default()),
            on_error: None,
            on_warn: None,
        }
    }

    /// Route errors to `handler` instead of the mode's default handling
    pub fn with_error_handler(
        mut self,
        handler: impl Fn(&VersionError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Route warnings to `handler` instead of the mode's default handling
    pub fn with_warning_handler(
        mut self,
        handler: impl Fn(&VersionWarning) + Send + Sync + 'static,
    ) -> Self {
        self.on_warn = Some(Box::new(handler));
        self
    }

    pub fn snapshot(&self) -> &VersionManifest {
        &self.snapshot
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, GuardState>, GuardError> {
        self.state.lock().map_err(|_| GuardError::LockPoisoned)
    }

    /// Validate one package's dependencies.
    ///
    /// Returns an error only in strict mode (or on lock poisoning). A strict
    /// failure leaves the package unvalidated so the next call checks again.
    pub fn validate(&self, options: &GuardOptions) -> Result<(), GuardError> {
        let key = format!("{}@{}", options.package_name, options.package_version);
        let own_version = {
            let mut state = self.lock_state()?;
            if state.validated.contains(&key) {
                debug!("{} already validated", key);
                return Ok(());
            }
            let own_version = Version::parse(&options.package_version);
            if let Ok(version) = &own_version {
                state
                    .installed
                    .insert(options.package_name.clone(), version.clone());
            }
            own_version
        };

        if !self.snapshot.validation.enforce_at_runtime {
            debug!("Runtime enforcement disabled, skipping {}", key);
            self.lock_state()?.validated.insert(key);
            return Ok(());
        }

        let (mut errors, warnings) = self.check_dependencies(options)?;
        if let Err(e) = own_version {
            errors.insert(
                0,
                VersionError {
                    kind: VersionErrorKind::InvalidSpec,
                    package: options.package_name.clone(),
                    dependency: None,
                    expected: None,
                    actual: Some(options.package_version.clone()),
                    message: format!(
                        "Invalid version {} for {}: {}",
                        options.package_version, options.package_name, e
                    ),
                },
            );
        }

        for error in errors {
            self.handle_error(error, options.mode)?;
        }
        for warning in warnings {
            self.handle_warning(warning, options.mode)?;
        }

        self.lock_state()?.validated.insert(key);
        Ok(())
    }

    fn check_dependencies(
        &self,
        options: &GuardOptions,
    ) -> Result<(Vec<VersionError>, Vec<VersionWarning>), GuardError> {
        let mut checks: Vec<DependencyCheck<'_>> = options
            .dependencies
            .iter()
            .map(|(name, spec)| DependencyCheck {
                name,
                requirement: spec.clone(),
                range: parse_range(spec),
                from_snapshot: false,
            })
            .collect();
        if let Some(pkg) = self.snapshot.packages.get(&options.package_name) {
            checks.extend(
                pkg.dependencies
                    .iter()
                    .filter(|(name, _)| !options.dependencies.contains_key(*name))
                    .map(|(name, range)| DependencyCheck {
                        name,
                        requirement: range.to_string(),
                        range: Ok(range.clone()),
                        from_snapshot: true,
                    }),
            );
        }

        let allow_prerelease = self.snapshot.validation.allow_prerelease;
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut state = self.lock_state()?;

        for check in checks {
            let range = match check.range {
                Ok(range) => range,
                Err(e) => {
                    errors.push(VersionError {
                        kind: VersionErrorKind::InvalidSpec,
                        package: options.package_name.clone(),
                        dependency: Some(check.name.to_string()),
                        expected: Some(check.requirement.clone()),
                        actual: None,
                        message: format!(
                            "Invalid version requirement {} for {}: {}",
                            check.requirement, check.name, e
                        ),
                    });
                    continue;
                }
            };

            let Some(installed) = self.installed_version(&mut state, check.name) else {
                errors.push(VersionError {
                    kind: VersionErrorKind::Missing,
                    package: options.package_name.clone(),
                    dependency: Some(check.name.to_string()),
                    expected: Some(check.requirement.clone()),
                    actual: None,
                    message: format!("Required dependency {} is not installed", check.name),
                });
                continue;
            };

            if !range.contains(&installed) {
                errors.push(VersionError {
                    kind: VersionErrorKind::Incompatible,
                    package: options.package_name.clone(),
                    dependency: Some(check.name.to_string()),
                    expected: Some(check.requirement.clone()),
                    actual: Some(installed.to_string()),
                    message: format!(
                        "{}@{} is incompatible with required {}",
                        check.name, installed, check.requirement
                    ),
                });
            } else if check.from_snapshot
                && !range.tested.is_empty()
                && !range.tested.iter().any(|t| t.core() == installed.core())
            {
                warnings.push(VersionWarning {
                    kind: VersionWarningKind::Untested,
                    package: check.name.to_string(),
                    message: format!(
                        "{}@{} has not been tested with {}",
                        check.name, installed, options.package_name
                    ),
                });
            }

            if installed.is_prerelease() && !allow_prerelease {
                warnings.push(VersionWarning {
                    kind: VersionWarningKind::Prerelease,
                    package: check.name.to_string(),
                    message: format!("Using prerelease version {installed}"),
                });
            }
        }

        Ok((errors, warnings))
    }

    fn installed_version(&self, state: &mut GuardState, package: &str) -> Option<Version> {
        if let Some(version) = state.installed.get(package) {
            return Some(version.clone());
        }
        let version = self.lookup.installed_version(package)?;
        state
            .installed
            .insert(package.to_string(), version.clone());
        Some(version)
    }

    fn handle_error(&self, error: VersionError, mode: GuardMode) -> Result<(), GuardError> {
        if let Some(handler) = &self.on_error {
            handler(&error);
            return Ok(());
        }

        match mode {
            GuardMode::Strict => Err(GuardError::Violation(error)),
            GuardMode::Warn => {
                error!("{} {}", GUARD_PREFIX, error.message);
                if let (Some(expected), Some(actual)) = (&error.expected, &error.actual) {
                    error!("  Expected: {}", expected);
                    error!("  Actual: {}", actual);
                }
                Ok(())
            }
            GuardMode::Silent => self.record(DiagnosticEntry::Error(error)),
        }
    }

    fn handle_warning(&self, warning: VersionWarning, mode: GuardMode) -> Result<(), GuardError> {
        if let Some(handler) = &self.on_warn {
            handler(&warning);
            return Ok(());
        }

        match mode {
            GuardMode::Strict | GuardMode::Warn => {
                warn!("{} {}", GUARD_PREFIX, warning.message);
                Ok(())
            }
            GuardMode::Silent => self.record(DiagnosticEntry::Warning(warning)),
        }
    }

    fn record(&self, entry: DiagnosticEntry) -> Result<(), GuardError> {
        self.lock_state()?.diagnostics.push(Diagnostic {
            timestamp: Utc::now(),
            entry,
        });
        Ok(())
    }

    /// Copy of the diagnostics recorded so far
    pub fn diagnostics(&self) -> Result<Vec<Diagnostic>, GuardError> {
        Ok(self.lock_state()?.diagnostics.clone())
    }

    pub fn is_validated(&self, package_name: &str, package_version: &str) -> Result<bool, GuardError> {
        let key = format!("{package_name}@{package_version}");
        Ok(self.lock_state()?.validated.contains(&key))
    }

    /// Forget validated packages, cached installed versions and diagnostics
    pub fn clear_cache(&self) -> Result<(), GuardError> {
        let mut state = self.lock_state()?;
        state.validated.clear();
        state.installed.clear();
        state.diagnostics.clear();
        Ok(())
    }
}

impl<L: InstalledVersions> fmt::Debug for RuntimeGuard<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeGuard")
            .field("snapshot_version", &self.snapshot.version)
            .field("packages", &self.snapshot.packages.len())
            .finish_non_exhaustive()
    }
}

/// Closure a package runs at load time to validate itself in warn mode
pub fn create_version_guard<L: InstalledVersions>(
    guard: Arc<RuntimeGuard<L>>,
    package_name: impl Into<String>,
    package_version: impl Into<String>,
    dependencies: IndexMap<String, String>,
) -> impl Fn() -> Result<(), GuardError> {
    let options = GuardOptions {
        package_name: package_name.into(),
        package_version: package_version.into(),
        dependencies,
        mode: GuardMode::Warn,
    };
    move || guard.validate(&options)
}
