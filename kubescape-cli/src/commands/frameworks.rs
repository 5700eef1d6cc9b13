//! `ksctl frameworks` command handler

use std::io::Write;

use serde::Serialize;

use crate::cli::FrameworksArgs;
use crate::error::CliError;
use crate::output::Render;

use super::Context;

/// Execute the `frameworks` command.
///
/// Lists the locally installed bundles, or with `--remote` every framework the
/// installed scanner can download.
pub async fn execute(args: FrameworksArgs, ctx: &Context) -> Result<(), CliError> {
    let (api, state) = ctx.ready_api(&args.install).await?;

    let report = if args.remote {
        let names = api.available_frameworks(&ctx.ui, &ctx.cancel).await?;
        let installed = names
            .iter()
            .map(|name| state.has_framework(name))
            .collect();
        FrameworksReport {
            source: "remote",
            names,
            installed,
        }
    } else {
        let names = api.frameworks_names();
        let installed = vec![true; names.len()];
        FrameworksReport {
            source: "local",
            names,
            installed,
        }
    };

    ctx.writer.render(&report)
}

#[derive(Serialize)]
pub struct FrameworksReport {
    pub source: &'static str,
    pub names: Vec<String>,
    /// Parallel to `names`
    pub installed: Vec<bool>,
}

impl Render for FrameworksReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Frameworks ({}):", self.source)?;
        for (name, installed) in self.names.iter().zip(&self.installed) {
            if *installed {
                writeln!(w, "  {} {name}", "✓".green())?;
            } else {
                writeln!(w, "    {name}")?;
            }
        }
        Ok(())
    }
}
