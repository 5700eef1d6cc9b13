//! Command handlers -- one module per subcommand

pub mod command;
pub mod config;
pub mod frameworks;
pub mod scan;
pub mod setup;
pub mod version;

use std::sync::Arc;

use kubescape_api::{KubescapeApi, TROUBLESHOOTING_URL};
use kubescape_core::config::{InstallConfig, InstallConfigBuilder, KubescapeConfig};
use kubescape_core::types::InstalledState;
use kubescape_core::ui::KubescapeUi;
use kubescape_installer::GithubSource;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::InstallArgs;
use crate::error::CliError;
use crate::output::OutputWriter;
use crate::ui::ConsoleUi;

/// Everything a command handler needs, resolved once in `main`.
pub struct Context {
    /// Effective configuration (file + env overrides + defaults)
    pub config: KubescapeConfig,
    pub writer: OutputWriter,
    /// Triggered by Ctrl-C
    pub cancel: CancellationToken,
    pub ui: ConsoleUi,
}

impl Context {
    /// Apply command-line install overrides on top of the configured `[install]` section.
    pub fn install_config(&self, args: &InstallArgs) -> Result<InstallConfig, CliError> {
        let mut builder = InstallConfigBuilder::from_config(self.config.install.clone());
        if let Some(version) = &args.scanner_version {
            builder = builder.version(version);
        }
        if let Some(dir) = &args.base_dir {
            builder = builder.base_directory(dir);
        }
        if let Some(dir) = &args.frameworks_dir {
            builder = builder.frameworks_directory(dir);
        }
        if !args.frameworks.is_empty() {
            builder = builder.scan_frameworks(&args.frameworks);
        }
        Ok(builder.build()?)
    }

    /// Build the facade and make sure the scanner is installed.
    pub async fn ready_api(
        &self,
        args: &InstallArgs,
    ) -> Result<(KubescapeApi<GithubSource>, Arc<InstalledState>), CliError> {
        let install = self.install_config(args)?;
        debug!(
            version = %install.version,
            base = %install.base_directory.display(),
            "preparing kubescape"
        );

        let api = KubescapeApi::github(self.config.source.clone())?;
        match api.try_setup(&self.ui, &install, &self.cancel).await {
            Ok(state) => Ok((api, state)),
            Err(e) => {
                if !e.is_cancelled() {
                    self.ui.show_help(
                        "Kubescape could not be installed. See the installation guide for manual steps.",
                        TROUBLESHOOTING_URL,
                    );
                }
                Err(e.into())
            }
        }
    }
}
