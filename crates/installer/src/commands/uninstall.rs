//! `dcctl uninstall infra`.

use anyhow::Result;
use clap::Subcommand;

use super::{connect, GlobalOptions};
use crate::helm::ChartReleaseManager;
use crate::orchestrator::ReconciliationDriver;
use crate::state::RunKind;

/// Remove DeviceChain components.
#[derive(Subcommand, Debug)]
pub enum UninstallCommand {
    /// Uninstall the infrastructure Helm releases.
    Infra,
}

impl UninstallCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let config = global.install_config();
        let control_plane = connect(&config).await?;
        let charts = ChartReleaseManager::new(&config)?;
        let mut driver = ReconciliationDriver::new(&config, control_plane, &charts);
        match self {
            Self::Infra => driver.run(RunKind::UninstallInfra).await?,
        }
        Ok(())
    }
}
