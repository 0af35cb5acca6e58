//! `dcctl bootstrap <dataset>`.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::bootstrap::{self, Dataset};
use crate::graphql::{Endpoint, GraphQlClient, DEVICE_MANAGEMENT};

/// Bootstrap system microservices with example datasets.
#[derive(Args, Debug)]
pub struct BootstrapCommand {
    /// Server hostname targeted for remote calls.
    #[arg(short, long, global = true, default_value = "localhost")]
    server: String,

    /// Instance id targeted for remote calls.
    #[arg(short, long, global = true, default_value = "dc1")]
    instance: String,

    /// Tenant id targeted for remote calls.
    #[arg(short, long, global = true, default_value = "tenant1")]
    tenant: String,

    #[command(subcommand)]
    dataset: DatasetCommand,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum DatasetCommand {
    /// Bootstrap construction sample data.
    Construction,
}

impl BootstrapCommand {
    fn endpoint(&self) -> Endpoint {
        Endpoint {
            server: self.server.clone(),
            instance: self.instance.clone(),
            tenant: self.tenant.clone(),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let dataset = match self.dataset {
            DatasetCommand::Construction => Dataset::Construction,
        };
        let client = GraphQlClient::new(&self.endpoint(), DEVICE_MANAGEMENT)?;
        bootstrap::run(dataset, client).await?;
        Ok(())
    }
}
