use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use tracing::{error, info, warn};

use brutal_compat::compat::report::{self, PackageManager};
use brutal_compat::compat::{CompatibilitySystem, VersionManifest, matrix};
use brutal_compat::config::{HTML_REPORT_FILE_NAME, MANIFEST_FILE_NAME, ValidationPolicy};
use brutal_compat::guard::{GuardMode, GuardOptions, RuntimeGuard};
use brutal_compat::parser::types::parse_package_arg;
use brutal_compat::version::Version;
use brutal_compat::{config, install, logging};

#[derive(Parser)]
#[command(name = "brutal-compat")]
#[command(version, about = "Version compatibility resolver for @brutal packages")]
struct Cli {
    /// Write JSON logs to a daily-rotated file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log to the default data directory instead of stderr
    #[arg(long, global = true, conflicts_with = "log_dir")]
    log_to_data_dir: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the compatibility manifest from workspace packages
    Generate {
        /// Workspace root containing packages/@brutal/*
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long, default_value = MANIFEST_FILE_NAME)]
        output: PathBuf,
        /// Also write the HTML matrix page
        #[arg(long)]
        html: bool,
        /// Do not fail installs on incompatibilities
        #[arg(long)]
        lenient: bool,
        #[arg(long)]
        allow_prerelease: bool,
    },
    /// Check installed (or given) package versions against a manifest
    Validate {
        #[arg(long, default_value = MANIFEST_FILE_NAME)]
        manifest: PathBuf,
        /// Directory to search upwards from for node_modules
        #[arg(long, default_value = ".")]
        from: PathBuf,
        /// Versions to check instead of discovered ones (name@version)
        #[arg(long = "package", value_name = "NAME@VERSION")]
        packages: Vec<String>,
    },
    /// Print a JSON compatibility report for a version assignment
    Report {
        #[arg(long, default_value = MANIFEST_FILE_NAME)]
        manifest: PathBuf,
        #[arg(long = "package", value_name = "NAME@VERSION", required = true)]
        packages: Vec<String>,
    },
    /// Register the validator in package.json install scripts
    InstallHook {
        #[arg(long, default_value = "package.json")]
        package_json: PathBuf,
    },
    /// Run the runtime guard for one package
    Guard {
        /// Package being loaded (name@version)
        #[arg(value_name = "NAME@VERSION")]
        package: String,
        /// Declared dependency requirement (name@range)
        #[arg(long = "dependency", value_name = "NAME@RANGE")]
        dependencies: Vec<String>,
        #[arg(long, value_enum, default_value_t = GuardMode::Warn)]
        mode: GuardMode,
        /// Snapshot to check against instead of the embedded one
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| cli.log_to_data_dir.then(config::log_dir));
    let _log_guard = logging::init(log_dir.as_deref()).context("Failed to set up logging")?;

    match cli.command {
        Command::Generate {
            root,
            output,
            html,
            lenient,
            allow_prerelease,
        } => {
            let policy = ValidationPolicy {
                strict: !lenient,
                allow_prerelease,
                ..ValidationPolicy::default()
            };
            generate(&root, &output, html, policy)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate {
            manifest,
            from,
            packages,
        } => Ok(validate(&manifest, &from, &packages)),
        Command::Report { manifest, packages } => {
            let manifest = VersionManifest::load(&manifest)?;
            let assignment = parse_assignment(&packages)?;
            let report = CompatibilitySystem::from_manifest(&manifest).report(&assignment, Utc::now());
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::InstallHook { package_json } => {
            let changed = install::install_hook(&package_json)?;
            if changed.is_empty() {
                println!("Hook already installed in {}", package_json.display());
            } else {
                for script in changed {
                    println!("Added to {script} script");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Guard {
            package,
            dependencies,
            mode,
            manifest,
        } => run_guard(&package, &dependencies, mode, manifest.as_deref()),
    }
}

fn generate(root: &Path, output: &Path, html: bool, policy: ValidationPolicy) -> anyhow::Result<()> {
    let descriptors = install::discover_workspace(root)?;
    let matrix = matrix::build(&descriptors)?;
    let manifest = VersionManifest::from_matrix(&matrix, Utc::now(), policy);
    manifest.save(output)?;
    println!("Compatibility matrix written to {}", output.display());

    if html {
        let html_path = output.with_file_name(HTML_REPORT_FILE_NAME);
        std::fs::write(&html_path, report::render_html(&manifest))
            .with_context(|| format!("Failed to write {}", html_path.display()))?;
        println!("HTML report written to {}", html_path.display());
    }
    Ok(())
}

/// Install-hook validation. Only an invalid result under a strict policy
/// fails; validator errors never block the install.
fn validate(manifest_path: &Path, from: &Path, packages: &[String]) -> ExitCode {
    match try_validate(manifest_path, from, packages) {
        Ok(code) => code,
        Err(e) => {
            error!("Error during validation: {:#}", e);
            eprintln!("Skipping compatibility check due to error.");
            ExitCode::SUCCESS
        }
    }
}

fn try_validate(manifest_path: &Path, from: &Path, packages: &[String]) -> anyhow::Result<ExitCode> {
    let manifest = VersionManifest::load(manifest_path)
        .context("Failed to load compatibility manifest")?;

    let installed: IndexMap<String, String> = if packages.is_empty() {
        install::discover_installed(from)?
    } else {
        packages
            .iter()
            .map(|arg| parse_package_arg(arg))
            .collect::<Result<_, _>>()?
    };
    if installed.is_empty() {
        info!("No @brutal packages found, skipping validation");
        return Ok(ExitCode::SUCCESS);
    }

    let system = CompatibilitySystem::from_manifest(&manifest);
    let result = system.validate_specs(&installed)?;
    let versions = installed
        .iter()
        .map(|(name, raw)| -> anyhow::Result<(String, Version)> {
            Ok((name.clone(), Version::parse(raw)?))
        })
        .collect::<anyhow::Result<IndexMap<_, _>>>()?;

    let manager = PackageManager::from_user_agent(
        &std::env::var("npm_config_user_agent").unwrap_or_default(),
    );
    print!(
        "{}",
        report::render_text(&result, &versions, manifest.validation.strict, manager)
    );

    if !result.valid && manifest.validation.strict {
        return Ok(ExitCode::FAILURE);
    }
    if !result.valid {
        warn!("Proceeding despite {} compatibility issues", result.issues.len());
    }
    Ok(ExitCode::SUCCESS)
}

fn parse_assignment(packages: &[String]) -> anyhow::Result<IndexMap<String, Version>> {
    packages
        .iter()
        .map(|arg| -> anyhow::Result<(String, Version)> {
            let (name, raw) = parse_package_arg(arg)?;
            let version = Version::parse(&raw).with_context(|| format!("Invalid version for {name}"))?;
            Ok((name, version))
        })
        .collect()
}

fn run_guard(
    package: &str,
    dependencies: &[String],
    mode: GuardMode,
    manifest: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let guard = match manifest {
        Some(path) => RuntimeGuard::new(VersionManifest::load(path)?),
        None => RuntimeGuard::embedded()?,
    };
    let (package_name, package_version) = parse_package_arg(package)?;
    let dependencies = dependencies
        .iter()
        .map(|arg| parse_package_arg(arg))
        .collect::<Result<IndexMap<_, _>, _>>()?;

    let options = GuardOptions {
        package_name,
        package_version,
        dependencies,
        mode,
    };
    if let Err(e) = guard.validate(&options) {
        eprintln!("{e}");
        return Ok(ExitCode::FAILURE);
    }

    if mode == GuardMode::Silent {
        println!("{}", serde_json::to_string_pretty(&guard.diagnostics()?)?);
    }
    Ok(ExitCode::SUCCESS)
}
