//! `ksctl command` command handler

use std::io::Write;

use serde::Serialize;

use crate::cli::CommandArgs;
use crate::error::CliError;
use crate::output::Render;

use super::Context;

/// Execute the `command` command.
///
/// Prints the exact shell line the scanner would be run with, including the
/// platform-specific `KUBECONFIG` prefix when `--kubeconfig` is given.
pub async fn execute(args: CommandArgs, ctx: &Context) -> Result<(), CliError> {
    let (api, _state) = ctx.ready_api(&args.install).await?;
    let line = api.build_command(&args.args.join(" "), args.kubeconfig.as_deref())?;
    ctx.writer.render(&CommandReport {
        platform: api.platform().to_string(),
        command: line,
    })
}

#[derive(Serialize)]
pub struct CommandReport {
    pub platform: String,
    pub command: String,
}

impl Render for CommandReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}", self.command)
    }
}
