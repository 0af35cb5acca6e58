//! `dcctl install core|infra`.

use anyhow::Result;
use clap::{Args, Subcommand};
use dc_k8s::crds::ClusterSpec;

use super::{connect, GlobalOptions};
use crate::helm::ChartReleaseManager;
use crate::orchestrator::{default_cluster, ReconciliationDriver};
use crate::state::RunKind;
use crate::ui;

/// Install DeviceChain components.
#[derive(Subcommand, Debug)]
pub enum InstallCommand {
    /// Install CRDs, RBAC, the operator and generated instance resources.
    Core(InstallCoreArgs),

    /// Install the infrastructure Helm releases (Redis, PostgreSQL, ...).
    Infra(InstallInfraArgs),
}

#[derive(Args, Debug)]
pub struct InstallCoreArgs {
    /// Domain recorded on the cluster resource.
    #[arg(long)]
    domain: Option<String>,

    /// Human-readable cluster name.
    #[arg(short, long)]
    name: Option<String>,

    /// Human-readable cluster description.
    #[arg(short, long = "desc")]
    description: Option<String>,
}

#[derive(Args, Debug)]
pub struct InstallInfraArgs {
    /// Download missing chart dependencies instead of failing.
    #[arg(long)]
    dependency_update: bool,
}

impl InstallCoreArgs {
    fn cluster(&self) -> ClusterSpec {
        let defaults = default_cluster();
        ClusterSpec {
            domain: self.domain.clone().unwrap_or(defaults.domain),
            name: self.name.clone().unwrap_or(defaults.name),
            description: self.description.clone().unwrap_or(defaults.description),
        }
    }
}

impl InstallCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        ui::print_banner();
        let mut config = global.install_config();
        if let Self::Infra(args) = self {
            config.dependency_update = args.dependency_update;
        }

        let control_plane = connect(&config).await?;
        let charts = ChartReleaseManager::new(&config)?;
        let driver = ReconciliationDriver::new(&config, control_plane, &charts);
        let (mut driver, kind) = match self {
            Self::Core(args) => (driver.with_cluster(args.cluster()), RunKind::InstallCore),
            Self::Infra(_) => (driver, RunKind::InstallInfra),
        };
        driver.run(kind).await?;
        Ok(())
    }
}
