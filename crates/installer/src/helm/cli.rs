//! Thin wrapper around the `helm` executable.

use std::path::{Path, PathBuf};
use std::process::Command;

use dc_k8s::{Error, Result};
use tracing::debug;

use super::ChartDescriptor;
use crate::config::HelmSettings;

/// Runs helm with the configured repository files, driver and kubeconfig.
#[derive(Debug, Clone)]
pub struct HelmCli {
    settings: HelmSettings,
}

impl HelmCli {
    #[must_use]
    pub fn new(settings: HelmSettings) -> Self {
        Self { settings }
    }

    fn run(&self, args: &[String]) -> Result<String> {
        debug!(binary = %self.settings.binary, args = ?args, "Running helm");
        let mut command = Command::new(&self.settings.binary);
        command
            .args(args)
            .env("HELM_REPOSITORY_CONFIG", &self.settings.repository_config)
            .env("HELM_REPOSITORY_CACHE", &self.settings.repository_cache)
            .env("HELM_DRIVER", self.settings.driver.to_string());
        if let Some(kubeconfig) = &self.settings.kubeconfig {
            command.env("KUBECONFIG", kubeconfig);
        }

        let output = command.output().map_err(|e| {
            Error::transport(format!("failed to execute {}: {e}", self.settings.binary))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let verb = args.first().map_or("", String::as_str);
            return Err(Error::transport(format!("helm {verb} failed: {}", stderr.trim())));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Download and unpack a chart below `dest`, returning the chart directory.
    pub fn pull(&self, descriptor: &ChartDescriptor, dest: &Path) -> Result<PathBuf> {
        self.run(&pull_args(descriptor, dest)).map_err(|e| match e {
            Error::Transport(msg) if is_not_found(&msg) => Error::not_found(
                "Chart",
                None,
                &format!("{}@{}", descriptor.reference(), descriptor.version),
            ),
            other => other,
        })?;
        Ok(dest.join(&descriptor.chart))
    }

    pub fn dependency_update(&self, chart_dir: &Path) -> Result<()> {
        self.run(&[
            "dependency".to_string(),
            "update".to_string(),
            chart_dir.display().to_string(),
        ])?;
        Ok(())
    }

    pub fn install(
        &self,
        descriptor: &ChartDescriptor,
        chart_dir: &Path,
        values_file: &Path,
        namespace: &str,
    ) -> Result<String> {
        self.run(&install_args(descriptor, chart_dir, values_file, namespace))
    }

    /// Uninstall a release. `Ok(false)` when it was not installed.
    pub fn uninstall(&self, descriptor: &ChartDescriptor, namespace: &str) -> Result<bool> {
        match self.run(&uninstall_args(descriptor, namespace)) {
            Ok(_) => Ok(true),
            Err(Error::Transport(msg)) if is_not_found(&msg) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn is_not_found(message: &str) -> bool {
    message.to_lowercase().contains("not found")
}

fn pull_args(descriptor: &ChartDescriptor, dest: &Path) -> Vec<String> {
    vec![
        "pull".to_string(),
        descriptor.reference(),
        "--version".to_string(),
        descriptor.version.clone(),
        "--untar".to_string(),
        "--untardir".to_string(),
        dest.display().to_string(),
    ]
}

/// CRDs are skipped and helm returns once the release is accepted.
fn install_args(
    descriptor: &ChartDescriptor,
    chart_dir: &Path,
    values_file: &Path,
    namespace: &str,
) -> Vec<String> {
    vec![
        "install".to_string(),
        descriptor.release_name.clone(),
        chart_dir.display().to_string(),
        "--namespace".to_string(),
        namespace.to_string(),
        "--skip-crds".to_string(),
        "--values".to_string(),
        values_file.display().to_string(),
    ]
}

fn uninstall_args(descriptor: &ChartDescriptor, namespace: &str) -> Vec<String> {
    vec![
        "uninstall".to_string(),
        descriptor.release_name.clone(),
        "--namespace".to_string(),
        namespace.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis() -> ChartDescriptor {
        ChartDescriptor::parse("01_bitnami_redis_17.3.0.properties", "dc-").unwrap()
    }

    #[test]
    fn test_pull_args() {
        let args = pull_args(&redis(), Path::new("/tmp/work"));
        assert_eq!(
            args,
            vec![
                "pull",
                "bitnami/redis",
                "--version",
                "17.3.0",
                "--untar",
                "--untardir",
                "/tmp/work"
            ]
        );
    }

    #[test]
    fn test_install_args_skip_crds_without_waiting() {
        let args = install_args(
            &redis(),
            Path::new("/tmp/work/redis"),
            Path::new("/tmp/work/overrides.yaml"),
            "dc-system",
        );
        assert_eq!(&args[..3], ["install", "dc-redis", "/tmp/work/redis"]);
        assert!(args.contains(&"--skip-crds".to_string()));
        assert!(!args.iter().any(|a| a == "--wait" || a == "--create-namespace"));
        let ns = args.iter().position(|a| a == "--namespace").unwrap();
        assert_eq!(args[ns + 1], "dc-system");
    }

    #[test]
    fn test_uninstall_args() {
        assert_eq!(
            uninstall_args(&redis(), "dc-system"),
            vec!["uninstall", "dc-redis", "--namespace", "dc-system"]
        );
    }

    #[test]
    fn test_not_found_detection() {
        assert!(is_not_found(
            "helm uninstall failed: Error: uninstall: Release not loaded: dc-redis: release: not found"
        ));
        assert!(!is_not_found("helm install failed: context deadline exceeded"));
    }

    #[test]
    fn test_missing_binary_is_transport() {
        let mut settings = crate::config::HelmSettings::from_env();
        settings.binary = "dcctl-no-such-helm-binary".to_string();
        let err = HelmCli::new(settings).uninstall(&redis(), "dc-system").unwrap_err();
        assert!(matches!(err, Error::Transport(ref m) if m.starts_with("failed to execute")));
    }
}
