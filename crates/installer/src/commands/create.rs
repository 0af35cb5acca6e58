//! `dcctl create instance|tenant|microservice|tenant-microservice`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::Colorize;
use dc_k8s::{
    HierarchyManager, InstanceCreateRequest, MicroserviceCreateRequest, TenantCreateRequest,
};

use super::{connect, description_or_default, name_or_default, GlobalOptions};
use crate::resgen::DEFAULT_INSTANCE_CONFIG;

/// Create DeviceChain resources.
#[derive(Subcommand, Debug)]
pub enum CreateCommand {
    /// Create a new DeviceChain instance.
    Instance(CreateInstanceArgs),

    /// Create a new tenant within an instance.
    Tenant(CreateTenantArgs),

    /// Create a new microservice within an instance.
    Microservice(CreateMicroserviceArgs),

    /// Bind an existing microservice to an existing tenant.
    TenantMicroservice(CreateTenantMicroserviceArgs),
}

/// Human-readable labels shared by the create commands.
#[derive(Args, Debug, Default)]
pub struct Labels {
    /// Human-readable name.
    #[arg(short, long)]
    name: Option<String>,

    /// Human-readable description.
    #[arg(short, long = "desc")]
    description: Option<String>,
}

impl Labels {
    fn resolve(&self, kind: &str, id: &str, now: DateTime<Utc>) -> (String, String) {
        (
            name_or_default(self.name.as_deref(), kind, id),
            description_or_default(self.description.as_deref(), kind, id, now),
        )
    }
}

#[derive(Args, Debug)]
pub struct CreateInstanceArgs {
    /// Instance id, also used as its namespace.
    instance_id: String,

    /// Instance configuration used as the template.
    #[arg(short, long, default_value = DEFAULT_INSTANCE_CONFIG)]
    config: String,

    #[command(flatten)]
    labels: Labels,
}

#[derive(Args, Debug)]
pub struct CreateTenantArgs {
    instance_id: String,
    tenant_id: String,

    #[command(flatten)]
    labels: Labels,
}

#[derive(Args, Debug)]
pub struct CreateMicroserviceArgs {
    instance_id: String,
    microservice_id: String,
    /// Microservice configuration used as the template.
    config_id: String,

    #[command(flatten)]
    labels: Labels,
}

#[derive(Args, Debug)]
pub struct CreateTenantMicroserviceArgs {
    instance_id: String,
    tenant_id: String,
    microservice_id: String,
}

impl CreateInstanceArgs {
    fn request(&self, now: DateTime<Utc>) -> InstanceCreateRequest {
        let (name, description) = self.labels.resolve("Instance", &self.instance_id, now);
        InstanceCreateRequest {
            id: self.instance_id.clone(),
            name,
            description,
            config_id: self.config.clone(),
        }
    }
}

impl CreateTenantArgs {
    fn request(&self, now: DateTime<Utc>) -> TenantCreateRequest {
        let (name, description) = self.labels.resolve("Tenant", &self.tenant_id, now);
        TenantCreateRequest {
            id: self.tenant_id.clone(),
            name,
            description,
        }
    }
}

impl CreateMicroserviceArgs {
    fn request(&self, now: DateTime<Utc>) -> MicroserviceCreateRequest {
        let (name, description) = self
            .labels
            .resolve("Microservice", &self.microservice_id, now);
        MicroserviceCreateRequest {
            id: self.microservice_id.clone(),
            config_id: self.config_id.clone(),
            name,
            description,
        }
    }
}

impl CreateCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let config = global.install_config();
        let hierarchy = HierarchyManager::new(connect(&config).await?);
        let now = Utc::now();

        let message = match self {
            Self::Instance(args) => {
                hierarchy.create_instance(&args.request(now)).await?;
                format!("Created DeviceChain instance '{}' successfully.", args.instance_id)
            }
            Self::Tenant(args) => {
                hierarchy
                    .create_tenant(&args.instance_id, &args.request(now))
                    .await?;
                format!("Created DeviceChain tenant '{}' successfully.", args.tenant_id)
            }
            Self::Microservice(args) => {
                hierarchy
                    .create_microservice(&args.instance_id, &args.request(now))
                    .await?;
                format!(
                    "Created DeviceChain microservice '{}' successfully.",
                    args.microservice_id
                )
            }
            Self::TenantMicroservice(args) => {
                let binding = hierarchy
                    .create_tenant_microservice(
                        &args.instance_id,
                        &args.tenant_id,
                        &args.microservice_id,
                    )
                    .await?;
                format!(
                    "Created DeviceChain tenant microservice '{}' successfully.",
                    binding.metadata.name.unwrap_or_default()
                )
            }
        };
        println!("{}", message.bright_green());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::GlobalOptions;
    use clap::Parser;
    use dc_k8s::crds::{InstanceConfiguration, InstanceConfigurationSpec};
    use dc_k8s::test_utils::MemoryControlPlane;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        global: GlobalOptions,
        #[command(subcommand)]
        command: CreateCommand,
    }

    fn parse(args: &[&str]) -> CreateCommand {
        TestCli::try_parse_from(std::iter::once("create").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_instance_defaults() {
        let CreateCommand::Instance(args) = parse(&["instance", "dc1"]) else {
            panic!("expected instance command");
        };
        let request = args.request(Utc::now());
        assert_eq!(request.id, "dc1");
        assert_eq!(request.config_id, "dcic-default");
        assert_eq!(request.name, "Instance 'dc1'");
        assert!(request.description.starts_with("DeviceChain instance 'dc1' created on "));
    }

    #[test]
    fn test_microservice_positional_order() {
        let CreateCommand::Microservice(args) = parse(&[
            "microservice",
            "dc1",
            "device-management",
            "device-management-default",
            "--name",
            "Device Management",
        ]) else {
            panic!("expected microservice command");
        };
        let request = args.request(Utc::now());
        assert_eq!(args.instance_id, "dc1");
        assert_eq!(request.id, "device-management");
        assert_eq!(request.config_id, "device-management-default");
        assert_eq!(request.name, "Device Management");
    }

    #[test]
    fn test_tenant_missing_argument_is_rejected() {
        let result = TestCli::try_parse_from(["create", "tenant", "dc1"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tenant_request_creates_tenant() {
        let memory = Arc::new(MemoryControlPlane::new());
        memory.put(&InstanceConfiguration::new(
            "dcic-default",
            InstanceConfigurationSpec {
                configuration: json!({"infrastructure": {}}),
            },
        ));
        let hierarchy = HierarchyManager::new(memory.clone());

        let CreateCommand::Instance(instance) = parse(&["instance", "dc1"]) else {
            panic!("expected instance command");
        };
        hierarchy.create_instance(&instance.request(Utc::now())).await.unwrap();

        let CreateCommand::Tenant(tenant) = parse(&["tenant", "dc1", "acme", "-n", "Acme"]) else {
            panic!("expected tenant command");
        };
        let created = hierarchy
            .create_tenant(&tenant.instance_id, &tenant.request(Utc::now()))
            .await
            .unwrap();
        assert_eq!(created.spec.name, "Acme");
        assert_eq!(created.metadata.namespace.as_deref(), Some("dc1"));
    }
}
