//! `ksctl setup` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use kubescape_core::types::InstalledState;

use crate::cli::InstallArgs;
use crate::error::CliError;
use crate::output::Render;

use super::Context;

/// Execute the `setup` command.
pub async fn execute(args: InstallArgs, ctx: &Context) -> Result<(), CliError> {
    let (_api, state) = ctx.ready_api(&args).await?;
    info!(version = %state.version, "setup finished");
    ctx.writer.render(&SetupReport::from(state.as_ref()))
}

/// Installed scanner summary.
#[derive(Serialize)]
pub struct SetupReport {
    pub version: String,
    pub is_latest: bool,
    pub platform: String,
    pub binary_path: String,
    pub frameworks_directory: String,
    pub frameworks: Vec<String>,
    pub scan_frameworks: Vec<String>,
}

impl From<&InstalledState> for SetupReport {
    fn from(state: &InstalledState) -> Self {
        Self {
            version: state.version.clone(),
            is_latest: state.is_latest,
            platform: state.platform.to_string(),
            binary_path: state.binary_path.display().to_string(),
            frameworks_directory: state.frameworks_directory.display().to_string(),
            frameworks: state.frameworks.iter().cloned().collect(),
            scan_frameworks: state.scan_frameworks.clone(),
        }
    }
}

impl Render for SetupReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let latest = if self.is_latest {
            "latest".green()
        } else {
            "not latest".yellow()
        };
        writeln!(w, "Kubescape {} ({latest})", self.version.bold())?;
        writeln!(w, "  Platform:    {}", self.platform)?;
        writeln!(w, "  Binary:      {}", self.binary_path)?;
        writeln!(w, "  Frameworks:  {}", self.frameworks_directory)?;
        for name in &self.frameworks {
            let marker = if self.scan_frameworks.contains(name) {
                "scan".green()
            } else {
                "installed".dimmed()
            };
            writeln!(w, "    {name:<24} {marker}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use kubescape_core::types::Platform;

    fn state() -> InstalledState {
        InstalledState {
            binary_path: PathBuf::from("/opt/ks/kubescape"),
            version: "v2.3.1".to_owned(),
            is_latest: false,
            frameworks: BTreeSet::from(["mitre".to_owned(), "nsa".to_owned()]),
            frameworks_directory: PathBuf::from("/opt/ks/frameworks"),
            scan_frameworks: vec!["nsa".to_owned()],
            platform: Platform::Linux,
        }
    }

    #[test]
    fn test_setup_report_from_state() {
        let report = SetupReport::from(&state());
        assert_eq!(report.version, "v2.3.1");
        assert_eq!(report.platform, "linux");
        assert_eq!(report.frameworks, vec!["mitre", "nsa"]);
        assert_eq!(report.scan_frameworks, vec!["nsa"]);
    }

    #[test]
    fn test_setup_report_text() {
        let mut buffer = Vec::new();
        SetupReport::from(&state())
            .render_text(&mut buffer)
            .expect("render should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("v2.3.1"));
        assert!(output.contains("/opt/ks/kubescape"));
        assert!(output.contains("nsa"));
        assert!(output.contains("mitre"));
    }
}
