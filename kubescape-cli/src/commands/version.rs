//! `ksctl version` command handler

use std::io::Write;

use serde::Serialize;

use crate::cli::InstallArgs;
use crate::error::CliError;
use crate::output::Render;

use super::Context;

/// Execute the `version` command.
///
/// Installs the scanner first if needed, so the reported version is always usable.
pub async fn execute(args: InstallArgs, ctx: &Context) -> Result<(), CliError> {
    let (api, _state) = ctx.ready_api(&args).await?;
    let report = VersionReport {
        version: api.version().ok_or(CliError::NotInstalled)?,
        is_latest: api.is_latest_version(),
        path: api
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    };
    ctx.writer.render(&report)
}

#[derive(Serialize)]
pub struct VersionReport {
    pub version: String,
    pub is_latest: bool,
    pub path: String,
}

impl Render for VersionReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.is_latest {
            writeln!(w, "{}", self.version)
        } else {
            writeln!(
                w,
                "{} {}",
                self.version,
                "(a newer release is available)".yellow()
            )
        }
    }
}
