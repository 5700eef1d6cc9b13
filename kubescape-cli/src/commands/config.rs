//! `ksctl config` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use kubescape_core::config::{DEFAULT_CONFIG_FILE, KubescapeConfig};

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Source label used when no configuration file is read.
const DEFAULTS_SOURCE: &str = "(defaults)";

/// Load the effective configuration.
///
/// An explicit path must exist. Without one, `kubescape.toml` in the working
/// directory is used when present, otherwise built-in defaults. Environment
/// overrides apply in every case.
pub async fn load_config(path: Option<&Path>) -> Result<(KubescapeConfig, String), CliError> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
    };

    match path {
        Some(path) => {
            let config = KubescapeConfig::load(&path).await?;
            Ok((config, path.display().to_string()))
        }
        None => {
            let mut config = KubescapeConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok((config, DEFAULTS_SOURCE.to_owned()))
        }
    }
}

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
        ConfigAction::Init => execute_init(writer),
    }
}

/// Execute the config validate subcommand.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails (parse errors, invalid values).
async fn execute_validate(config_path: Option<&Path>, writer: &OutputWriter) -> Result<(), CliError> {
    let source = config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_owned());
    info!(path = %source, "validating configuration");

    let report = match load_config(config_path).await {
        Ok((_, source)) => ConfigValidationReport {
            source,
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source,
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Execute the config show subcommand.
///
/// Displays the effective configuration (file + env overrides + defaults),
/// optionally restricted to one section.
async fn execute_show(
    config_path: Option<&Path>,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (config, source) = load_config(config_path).await?;
    let report = ConfigReport::new(&config, source, section)?;
    writer.render(&report)
}

/// Execute the config init subcommand: print a default configuration.
fn execute_init(writer: &OutputWriter) -> Result<(), CliError> {
    let report = ConfigReport::new(&KubescapeConfig::default(), DEFAULTS_SOURCE.to_owned(), None)?;
    writer.render(&report)
}

/// Configuration display report.
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Structured settings for JSON output
    pub settings: serde_json::Value,
    /// Serialized TOML configuration (text output only)
    #[serde(skip)]
    pub config_toml: String,
}

impl ConfigReport {
    /// Build a report for the whole configuration or one of its sections.
    ///
    /// # Errors
    ///
    /// `CliError::Command` for an unknown section name.
    pub fn new(
        config: &KubescapeConfig,
        source: String,
        section: Option<String>,
    ) -> Result<Self, CliError> {
        let (settings, config_toml) = match section.as_deref() {
            None => (serde_json::to_value(config)?, config.to_toml()?),
            Some("general") => (
                serde_json::to_value(&config.general)?,
                section_toml(&config.general),
            ),
            Some("install") => (
                serde_json::to_value(&config.install)?,
                section_toml(&config.install),
            ),
            Some("source") => (
                serde_json::to_value(&config.source)?,
                section_toml(&config.source),
            ),
            Some(other) => {
                return Err(CliError::Command(format!(
                    "unknown section: {other} (expected: general, install, source)"
                )));
            }
        };

        Ok(Self {
            source,
            section,
            settings,
            config_toml,
        })
    }
}

fn section_toml<T: Serialize>(section: &T) -> String {
    toml::to_string_pretty(section).unwrap_or_else(|e| format!("(serialization error: {e})"))
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{section}]");
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
