//! Generation of default configuration resources.
//!
//! `dcctl resgen` writes an `InstanceConfiguration` and the default
//! microservice configurations as YAML into the resources directory, where
//! `install core` picks them up in its last phase.

use std::path::{Path, PathBuf};

use dc_k8s::crds::{
    InstanceConfiguration, InstanceConfigurationSpec, MicroserviceConfiguration,
    MicroserviceConfigurationSpec, GROUP,
};
use dc_k8s::Result;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// Id of the instance configuration created by `resgen`.
pub const DEFAULT_INSTANCE_CONFIG: &str = "dcic-default";

/// Id of the device management microservice configuration.
pub const DEVICE_MANAGEMENT_CONFIG: &str = "device-management-default";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedisSettings {
    pub hostname: String,
    pub port: u16,
    pub node_count: u32,
    pub master_group_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KafkaSettings {
    pub hostname: String,
    pub port: u16,
    pub default_topic_partitions: u32,
    pub default_topic_replication_factor: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSettings {
    pub enabled: bool,
    pub http_port: u16,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrpcSettings {
    pub max_retry_count: u32,
    pub initial_backoff_seconds: u32,
    pub max_backoff_seconds: u32,
    pub backoff_multiplier: f32,
    #[serde(rename = "resolveFQDN")]
    pub resolve_fqdn: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfrastructureSettings {
    pub redis: RedisSettings,
    pub kafka: KafkaSettings,
    pub metrics: MetricsSettings,
    pub grpc: GrpcSettings,
}

/// A datastore type plus its free-form connection settings.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSettings {
    #[serde(rename = "type")]
    pub store_type: String,
    pub configuration: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersistenceSettings {
    pub rdb: StoreSettings,
    pub tsdb: StoreSettings,
}

/// Payload of the default `InstanceConfiguration`.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSettings {
    pub infrastructure: InfrastructureSettings,
    pub persistence: PersistenceSettings,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            infrastructure: InfrastructureSettings {
                redis: RedisSettings {
                    hostname: "dc-redis-master.dc-system".into(),
                    port: 6379,
                    node_count: 3,
                    master_group_name: "devicechain".into(),
                },
                kafka: KafkaSettings {
                    hostname: "dc-kafka-kafka-bootstrap".into(),
                    port: 9092,
                    default_topic_partitions: 8,
                    default_topic_replication_factor: 3,
                },
                metrics: MetricsSettings {
                    enabled: true,
                    http_port: 9090,
                },
                grpc: GrpcSettings {
                    max_retry_count: 6,
                    initial_backoff_seconds: 10,
                    max_backoff_seconds: 600,
                    backoff_multiplier: 1.5,
                    resolve_fqdn: false,
                },
            },
            persistence: PersistenceSettings {
                rdb: StoreSettings {
                    store_type: "postgres95".into(),
                    configuration: json!({
                        "hostname": "dc-postgresql.dc-system",
                        "port": 5432,
                        "maxConnections": 5,
                        "username": "devicechain",
                        "password": "devicechain",
                    }),
                },
                tsdb: StoreSettings {
                    store_type: "timescaledb".into(),
                    configuration: json!({
                        "hostname": "dc-timescaledb-single.dc-system",
                        "port": 5432,
                        "databaseName": "tenant_${tenant.id}",
                    }),
                },
            },
        }
    }
}

/// A rendered resource and the file stem it is written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResource {
    pub name: String,
    pub content: String,
}

impl GeneratedResource {
    fn new(id: &str, content: String) -> Self {
        Self {
            name: format!("{GROUP}_{id}"),
            content,
        }
    }
}

/// Render every default configuration resource.
pub fn instance_resources() -> Result<Vec<GeneratedResource>> {
    let instance = InstanceConfiguration::new(
        DEFAULT_INSTANCE_CONFIG,
        InstanceConfigurationSpec {
            configuration: serde_json::to_value(InstanceSettings::default())?,
        },
    );
    let device_management = MicroserviceConfiguration::new(
        DEVICE_MANAGEMENT_CONFIG,
        MicroserviceConfigurationSpec {
            functional_area: "device-management".into(),
            image: "devicechain.io/devicemanagament:v0.0.0".into(),
            configuration: json!({"nested": {"test": "test"}}),
        },
    );

    Ok(vec![
        GeneratedResource::new(DEFAULT_INSTANCE_CONFIG, serde_yaml::to_string(&instance)?),
        GeneratedResource::new(
            DEVICE_MANAGEMENT_CONFIG,
            serde_yaml::to_string(&device_management)?,
        ),
    ])
}

/// Write resources as `<name>.yaml` below `dir`, creating it if needed.
pub fn write_resources(dir: &Path, resources: &[GeneratedResource]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(resources.len());
    for resource in resources {
        let path = dir.join(format!("{}.yaml", resource.name));
        std::fs::write(&path, &resource.content)?;
        debug!(path = %path.display(), "Generated resource");
        written.push(path);
    }
    Ok(written)
}
