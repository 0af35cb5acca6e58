//! Installer configuration.
//!
//! Defaults for the DeviceChain system namespace, bundle locations and the
//! Helm repositories infrastructure charts are pulled from. Helm settings are
//! read from the same environment variables the helm CLI honours.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Namespace holding the operator and infrastructure releases. Every bundled
/// manifest targets it.
pub const SYSTEM_NAMESPACE: &str = "dc-system";

/// Prefix prepended to every chart name to form its release name.
pub const RELEASE_PREFIX: &str = "dc-";

/// Field manager used for server-side apply.
pub const FIELD_MANAGER: &str = "dcctl";

/// Bundle tree shipped alongside this crate.
pub const DEFAULT_BUNDLE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/bundle");

/// Directory `resgen` writes to and `install core` applies from.
pub const DEFAULT_RESOURCES_DIR: &str = "resources";

/// Helm release storage backend (`HELM_DRIVER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    #[default]
    Secret,
    ConfigMap,
    Memory,
    Sql,
}

impl std::fmt::Display for StorageDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secret => write!(f, "secret"),
            Self::ConfigMap => write!(f, "configmap"),
            Self::Memory => write!(f, "memory"),
            Self::Sql => write!(f, "sql"),
        }
    }
}

impl std::str::FromStr for StorageDriver {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "secret" | "secrets" => Ok(Self::Secret),
            "configmap" | "configmaps" => Ok(Self::ConfigMap),
            "memory" => Ok(Self::Memory),
            "sql" => Ok(Self::Sql),
            _ => Err(anyhow::anyhow!(
                "Unknown helm driver: {s}. Supported: secret, configmap, memory, sql"
            )),
        }
    }
}

/// A chart repository registered before infrastructure charts are installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySource {
    pub name: String,
    pub url: String,
}

impl RepositorySource {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Repositories hosting the infrastructure charts.
#[must_use]
pub fn default_repositories() -> Vec<RepositorySource> {
    vec![
        RepositorySource::new("bitnami", "https://charts.bitnami.com/bitnami"),
        RepositorySource::new("timescale", "https://charts.timescale.com"),
        RepositorySource::new("mosquitto", "https://k8s-at-home.com/charts/"),
    ]
}

/// Settings for invoking the helm CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelmSettings {
    /// Helm executable.
    pub binary: String,
    /// Kubeconfig passed through to helm, if any.
    pub kubeconfig: Option<PathBuf>,
    pub driver: StorageDriver,
    /// `repositories.yaml` listing registered repositories.
    pub repository_config: PathBuf,
    /// Directory holding downloaded repository indexes.
    pub repository_cache: PathBuf,
}

impl HelmSettings {
    /// Resolve settings from `HELM_*` variables, falling back to helm's own defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let repository_config = var("HELM_REPOSITORY_CONFIG").map_or_else(
            || helm_home(dirs::config_dir()).join("repositories.yaml"),
            PathBuf::from,
        );
        let repository_cache = var("HELM_REPOSITORY_CACHE").map_or_else(
            || helm_home(dirs::cache_dir()).join("repository"),
            PathBuf::from,
        );
        let driver = var("HELM_DRIVER")
            .and_then(|d| d.parse().ok())
            .unwrap_or_default();

        Self {
            binary: var("HELM_BINARY").unwrap_or_else(|| "helm".to_string()),
            kubeconfig: var("KUBECONFIG").map(PathBuf::from),
            driver,
            repository_config,
            repository_cache,
        }
    }
}

fn helm_home(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(std::env::temp_dir).join("helm")
}

/// Full installer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Prefix for Helm release names.
    pub release_prefix: String,
    /// Root of the manifest and chart bundles.
    pub bundle_dir: PathBuf,
    /// Generated instance/microservice resources.
    pub resources_dir: PathBuf,
    pub field_manager: String,
    /// Repositories registered by `install infra`, in order.
    pub repositories: Vec<RepositorySource>,
    /// Download missing chart dependencies instead of failing.
    pub dependency_update: bool,
    pub helm: HelmSettings,
}

impl InstallConfig {
    /// Create config with the standard DeviceChain defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            release_prefix: RELEASE_PREFIX.into(),
            bundle_dir: PathBuf::from(DEFAULT_BUNDLE_DIR),
            resources_dir: PathBuf::from(DEFAULT_RESOURCES_DIR),
            field_manager: FIELD_MANAGER.into(),
            repositories: default_repositories(),
            dependency_update: false,
            helm: HelmSettings::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = InstallConfig::with_defaults();
        assert_eq!(config.release_prefix, "dc-");
        assert_eq!(config.resources_dir, PathBuf::from("resources"));
        assert!(!config.dependency_update);
        assert!(config.bundle_dir.ends_with("bundle"));
    }

    #[test]
    fn test_default_repositories_in_order() {
        let names: Vec<_> = default_repositories().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["bitnami", "timescale", "mosquitto"]);
    }

    #[test]
    fn test_driver_parsing() {
        assert_eq!("secret".parse::<StorageDriver>().unwrap(), StorageDriver::Secret);
        assert_eq!("ConfigMaps".parse::<StorageDriver>().unwrap(), StorageDriver::ConfigMap);
        assert_eq!("".parse::<StorageDriver>().unwrap(), StorageDriver::Secret);
        assert!("etcd".parse::<StorageDriver>().is_err());
    }

    #[test]
    fn test_driver_display_round_trips() {
        for driver in [StorageDriver::Secret, StorageDriver::ConfigMap, StorageDriver::Memory] {
            assert_eq!(driver.to_string().parse::<StorageDriver>().unwrap(), driver);
        }
    }
}
