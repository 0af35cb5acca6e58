//! CLI subcommands.
//!
//! Each command maps onto one hierarchy, driver or dataset call; any error is
//! returned to `main` and turns into a non-zero exit.

pub mod bootstrap;
pub mod create;
pub mod install;
pub mod resgen;
pub mod uninstall;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;
use dc_k8s::{ControlPlane, KubeControlPlane};

use crate::config::{InstallConfig, DEFAULT_BUNDLE_DIR, DEFAULT_RESOURCES_DIR};

/// Options accepted by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Root of the CRD, RBAC, operator and chart bundles.
    #[arg(long, global = true, env = "DCCTL_BUNDLE_DIR", default_value = DEFAULT_BUNDLE_DIR)]
    pub bundle_dir: PathBuf,

    /// Directory holding generated instance resources.
    #[arg(long, global = true, env = "DCCTL_RESOURCES_DIR", default_value = DEFAULT_RESOURCES_DIR)]
    pub resources_dir: PathBuf,
}

impl GlobalOptions {
    #[must_use]
    pub fn install_config(&self) -> InstallConfig {
        let mut config = InstallConfig::with_defaults();
        config.bundle_dir.clone_from(&self.bundle_dir);
        config.resources_dir.clone_from(&self.resources_dir);
        config
    }
}

/// Connect to the cluster selected by the ambient kubeconfig.
pub(crate) async fn connect(config: &InstallConfig) -> Result<Arc<dyn ControlPlane>> {
    let control_plane = KubeControlPlane::try_default(config.field_manager.clone())
        .await
        .context("Failed to connect to Kubernetes")?;
    Ok(Arc::new(control_plane))
}

/// `--name` value, or `<Kind> '<id>'`.
pub(crate) fn name_or_default(name: Option<&str>, kind: &str, id: &str) -> String {
    match name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{kind} '{id}'"),
    }
}

/// `--desc` value, or `DeviceChain <kind> '<id>' created on <timestamp>`.
pub(crate) fn description_or_default(
    description: Option<&str>,
    kind: &str,
    id: &str,
    now: DateTime<Utc>,
) -> String {
    match description {
        Some(description) if !description.is_empty() => description.to_string(),
        _ => format!(
            "DeviceChain {} '{id}' created on {}",
            kind.to_lowercase(),
            now.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_names() {
        assert_eq!(name_or_default(None, "Instance", "dc1"), "Instance 'dc1'");
        assert_eq!(name_or_default(Some(""), "Tenant", "acme"), "Tenant 'acme'");
        assert_eq!(name_or_default(Some("Acme"), "Tenant", "acme"), "Acme");
    }

    #[test]
    fn test_default_description() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(
            description_or_default(None, "Instance", "dc1", now),
            "DeviceChain instance 'dc1' created on 2024-05-01T12:30:00Z"
        );
        assert_eq!(
            description_or_default(Some("mine"), "Instance", "dc1", now),
            "mine"
        );
    }

    #[test]
    fn test_install_config_from_options() {
        let options = GlobalOptions {
            bundle_dir: PathBuf::from("/opt/bundle"),
            resources_dir: PathBuf::from("/opt/resources"),
        };
        let config = options.install_config();
        assert_eq!(config.bundle_dir, PathBuf::from("/opt/bundle"));
        assert_eq!(config.resources_dir, PathBuf::from("/opt/resources"));
    }
}
