//! ksctl -- command-line front-end for the Kubescape scanner.
//!
//! Parses arguments, loads `kubescape.toml`, initializes logging and
//! dispatches to one handler per subcommand. Ctrl-C cancels the running
//! operation instead of killing the process mid-install.

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod ui;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Commands};
use crate::commands::Context;
use crate::error::CliError;
use crate::output::OutputWriter;
use crate::ui::ConsoleUi;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    // config subcommands report loading errors themselves
    if let Commands::Config(args) = cli.command {
        return commands::config::execute(args, cli.config.as_deref(), &writer).await;
    }

    let (mut config, source) = commands::config::load_config(cli.config.as_deref()).await?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    logging::init_tracing(&config.general).map_err(|e| CliError::Config(e.to_string()))?;
    kubescape_core::metrics::describe_all();
    tracing::debug!(source = %source, "configuration loaded");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let ctx = Context {
        config,
        writer,
        cancel,
        ui: ConsoleUi,
    };

    match cli.command {
        Commands::Setup(args) => commands::setup::execute(args, &ctx).await,
        Commands::Scan(args) => commands::scan::execute(args, &ctx).await,
        Commands::ScanCluster(args) => commands::scan::execute_cluster(args, &ctx).await,
        Commands::Version(args) => commands::version::execute(args, &ctx).await,
        Commands::Frameworks(args) => commands::frameworks::execute(args, &ctx).await,
        Commands::Command(args) => commands::command::execute(args, &ctx).await,
        Commands::Config(_) => unreachable!("handled before configuration loading"),
    }
}
