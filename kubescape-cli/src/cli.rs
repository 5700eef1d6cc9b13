//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// ksctl -- install, update and run the Kubescape scanner.
///
/// Use `ksctl <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "ksctl", version, about, long_about = None)]
pub struct Cli {
    /// Path to the kubescape.toml configuration file.
    ///
    /// Without this flag `kubescape.toml` is used when present, defaults otherwise.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install or update the scanner binary and framework bundles.
    Setup(InstallArgs),

    /// Scan a Kubernetes manifest file.
    Scan(ScanArgs),

    /// Scan the cluster of the current kubeconfig context.
    ScanCluster(ScanClusterArgs),

    /// Show the installed scanner version.
    Version(InstallArgs),

    /// List installed (or remotely available) frameworks.
    Frameworks(FrameworksArgs),

    /// Print the command line used to invoke the scanner.
    Command(CommandArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- shared install overrides ----

/// Install settings that override the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Scanner version to install ("latest" or a tag such as v2.3.1).
    #[arg(long = "scanner-version")]
    pub scanner_version: Option<String>,

    /// Directory holding the scanner binary.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Directory holding framework bundles.
    #[arg(long)]
    pub frameworks_dir: Option<PathBuf>,

    /// Frameworks to scan with (repeatable, replaces the configured list).
    #[arg(short, long = "framework")]
    pub frameworks: Vec<String>,
}

// ---- scan ----

/// Scan a manifest file.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Manifest file to scan.
    pub file: PathBuf,

    /// Exit with status 0 even when controls fail.
    #[arg(long)]
    pub no_fail: bool,

    #[command(flatten)]
    pub install: InstallArgs,
}

// ---- scan-cluster ----

/// Scan the cluster.
#[derive(Args, Debug)]
pub struct ScanClusterArgs {
    /// Credential file exported to the scanner as KUBECONFIG.
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Exit with status 0 even when controls fail.
    #[arg(long)]
    pub no_fail: bool,

    #[command(flatten)]
    pub install: InstallArgs,
}

// ---- frameworks ----

/// List frameworks.
#[derive(Args, Debug)]
pub struct FrameworksArgs {
    /// Ask the scanner for every framework it can download.
    #[arg(long)]
    pub remote: bool,

    #[command(flatten)]
    pub install: InstallArgs,
}

// ---- command ----

/// Print a scanner command line.
#[derive(Args, Debug)]
pub struct CommandArgs {
    /// Arguments passed to the scanner (e.g. `scan framework nsa pod.yaml`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Credential file exported to the scanner as KUBECONFIG.
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    #[command(flatten)]
    pub install: InstallArgs,
}

// ---- config ----

/// Manage ksctl configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, install, source).
        #[arg(long)]
        section: Option<String>,
    },
    /// Print a default configuration file.
    Init,
}
