//! Helm chart release lifecycle.
//!
//! Chart descriptors come from catalog file names of the form
//! `<order>_<repository>_<chart>_<version>.properties`; each line of the file
//! body is one `--set` style override. Releases are never upgraded in place:
//! the driver uninstalls before every install.

mod chart;
mod cli;
pub mod repository;
pub mod values;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use dc_k8s::{Assured, Error, Result};
use tracing::{debug, info};

pub use chart::{ChartDependency, ChartMetadata};
pub use cli::HelmCli;
pub use repository::{RepositoryEntry, RepositoryFile};

use crate::catalog::split_file_name;
use crate::config::{InstallConfig, RepositorySource, SYSTEM_NAMESPACE};

/// Parsed identity of a chart release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartDescriptor {
    pub repository: String,
    pub chart: String,
    pub version: String,
    pub release_name: String,
}

impl ChartDescriptor {
    /// Parse `<order>_<repository>_<chart>_<version>.properties`.
    ///
    /// # Errors
    ///
    /// `Validation` unless the name has exactly four `_`-separated parts.
    pub fn parse(file_name: &str, release_prefix: &str) -> Result<Self> {
        let parts = split_file_name(file_name, ".properties", 4)?;
        Ok(Self {
            repository: parts[1].to_string(),
            chart: parts[2].to_string(),
            version: parts[3].to_string(),
            release_name: format!("{release_prefix}{}", parts[2]),
        })
    }

    /// `<repository>/<chart>` as helm resolves it.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}/{}", self.repository, self.chart)
    }
}

impl std::fmt::Display for ChartDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} {})", self.release_name, self.reference(), self.version)
    }
}

/// One override per line, trimmed. Blank lines are kept as empty entries.
#[must_use]
pub fn parse_overrides(content: &str) -> Vec<String> {
    content.split('\n').map(|line| line.trim().to_string()).collect()
}

/// Read a descriptor file's override lines.
pub fn load_overrides(path: &Path) -> Result<Vec<String>> {
    Ok(parse_overrides(&std::fs::read_to_string(path)?))
}

/// Result of registering a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryStatus {
    /// Already registered under that name; nothing fetched.
    Found,
    /// Index downloaded, validated and the entry persisted.
    Added,
}

/// Result of an uninstall attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed,
    NotInstalled,
}

/// Chart release operations used by the reconciliation driver.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChartReleases: Send + Sync {
    /// Load the repository file, creating an empty one if absent.
    async fn assure_repository_config(&self) -> Result<Assured<RepositoryFile>>;

    /// Register a repository unless one with the same name exists.
    async fn add_repository(
        &self,
        source: &RepositorySource,
        file: &mut RepositoryFile,
    ) -> Result<RepositoryStatus>;

    async fn install_release(&self, descriptor: &ChartDescriptor, overrides: &[String])
        -> Result<()>;

    async fn uninstall_release(&self, descriptor: &ChartDescriptor) -> Result<UninstallOutcome>;
}

/// [`ChartReleases`] backed by the helm CLI and HTTP repository access.
pub struct ChartReleaseManager {
    helm: HelmCli,
    http: reqwest::Client,
    namespace: String,
    repository_config: PathBuf,
    repository_cache: PathBuf,
    dependency_update: bool,
}

impl ChartReleaseManager {
    /// Build a manager from installer configuration.
    pub fn new(config: &InstallConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            helm: HelmCli::new(config.helm.clone()),
            http,
            namespace: SYSTEM_NAMESPACE.to_string(),
            repository_config: config.helm.repository_config.clone(),
            repository_cache: config.helm.repository_cache.clone(),
            dependency_update: config.dependency_update,
        })
    }
}

#[async_trait]
impl ChartReleases for ChartReleaseManager {
    async fn assure_repository_config(&self) -> Result<Assured<RepositoryFile>> {
        let path = &self.repository_config;
        if path.exists() {
            debug!(path = %path.display(), "Loading repository file");
            return Ok(Assured::Existing(RepositoryFile::load(path)?));
        }
        let file = RepositoryFile::default();
        file.write(path)?;
        info!(path = %path.display(), "Created repository file");
        Ok(Assured::Created(file))
    }

    async fn add_repository(
        &self,
        source: &RepositorySource,
        file: &mut RepositoryFile,
    ) -> Result<RepositoryStatus> {
        if file.has(&source.name) {
            return Ok(RepositoryStatus::Found);
        }

        let (index, raw) = repository::fetch_index(&self.http, &source.url).await?;
        std::fs::create_dir_all(&self.repository_cache)?;
        std::fs::write(
            repository::cache_path(&self.repository_cache, &source.name),
            raw,
        )?;

        file.update(RepositoryEntry::new(&source.name, &source.url));
        file.write(&self.repository_config)?;
        info!(
            repository = %source.name,
            url = %source.url,
            charts = index.version_count(),
            "Added chart repository"
        );
        Ok(RepositoryStatus::Added)
    }

    async fn install_release(
        &self,
        descriptor: &ChartDescriptor,
        overrides: &[String],
    ) -> Result<()> {
        let workdir = tempfile::tempdir()?;
        let chart_dir = self.helm.pull(descriptor, workdir.path())?;
        let values = values::merge_overrides(overrides)?;

        let metadata = ChartMetadata::load(&chart_dir)?;
        metadata.ensure_installable()?;

        let missing = metadata.missing_dependencies(&chart_dir)?;
        if !missing.is_empty() {
            if !self.dependency_update {
                return Err(Error::not_found("ChartDependency", None, &missing.join(", ")));
            }
            info!(chart = %descriptor.chart, missing = ?missing, "Updating chart dependencies");
            self.helm.dependency_update(&chart_dir)?;
        }

        let values_file = workdir.path().join("overrides.yaml");
        std::fs::write(&values_file, serde_yaml::to_string(&values)?)?;

        self.helm
            .install(descriptor, &chart_dir, &values_file, &self.namespace)?;
        info!(release = %descriptor.release_name, version = %descriptor.version, "Installed release");
        Ok(())
    }

    async fn uninstall_release(&self, descriptor: &ChartDescriptor) -> Result<UninstallOutcome> {
        if self.helm.uninstall(descriptor, &self.namespace)? {
            info!(release = %descriptor.release_name, "Uninstalled release");
            Ok(UninstallOutcome::Removed)
        } else {
            debug!(release = %descriptor.release_name, "Release not installed");
            Ok(UninstallOutcome::NotInstalled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_descriptor() {
        let descriptor = ChartDescriptor::parse("x_bitnami_redis_17.3.0.properties", "dc-").unwrap();
        assert_eq!(
            descriptor,
            ChartDescriptor {
                repository: "bitnami".into(),
                chart: "redis".into(),
                version: "17.3.0".into(),
                release_name: "dc-redis".into(),
            }
        );
        assert_eq!(descriptor.reference(), "bitnami/redis");
    }

    #[test]
    fn test_parse_descriptor_token_count() {
        for name in [
            "badname.properties",
            "01_bitnami_redis.properties",
            "01_bitnami_redis_17.3.0_extra.properties",
        ] {
            assert!(
                matches!(ChartDescriptor::parse(name, "dc-"), Err(Error::Validation(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_shipped_chart_descriptors_parse() {
        let catalog = crate::catalog::ResourceCatalog::new(crate::config::DEFAULT_BUNDLE_DIR);
        let releases: Vec<String> = catalog
            .entries(crate::catalog::Bundle::Charts)
            .unwrap()
            .iter()
            .map(|e| ChartDescriptor::parse(&e.file_name, "dc-").unwrap().release_name)
            .collect();
        assert_eq!(
            releases,
            vec!["dc-redis", "dc-postgresql", "dc-timescaledb-single", "dc-mosquitto"]
        );
    }

    #[test]
    fn test_overrides_keep_blank_lines() {
        let overrides = parse_overrides("  auth.enabled=false \n\narchitecture=standalone\n");
        assert_eq!(
            overrides,
            vec!["auth.enabled=false", "", "architecture=standalone", ""]
        );
    }

    #[test]
    fn test_load_overrides_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("01_bitnami_redis_17.3.0.properties");
        std::fs::write(&file, "a=1\r\nb=2").unwrap();
        assert_eq!(load_overrides(&file).unwrap(), vec!["a=1", "b=2"]);
    }

    fn manager(root: &Path) -> ChartReleaseManager {
        let mut config = InstallConfig::with_defaults();
        config.helm.repository_config = root.join("helm/repositories.yaml");
        config.helm.repository_cache = root.join("helm/cache");
        ChartReleaseManager::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_assure_repository_config_creates_then_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = manager(tmp.path());

        let first = manager.assure_repository_config().await.unwrap();
        assert!(first.was_created());
        let written =
            std::fs::read_to_string(tmp.path().join("helm/repositories.yaml")).unwrap();
        assert!(written.starts_with("apiVersion: v1\n"), "{written}");

        let second = manager.assure_repository_config().await.unwrap();
        assert!(!second.was_created());
        assert!(second.into_inner().repositories.is_empty());
    }

    #[tokio::test]
    async fn test_add_repository_persists_valid_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.yaml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("apiVersion: v1\nentries:\n  redis:\n  - name: redis\n    version: 17.3.0\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let manager = manager(tmp.path());
        let mut file = manager.assure_repository_config().await.unwrap().into_inner();
        let source = RepositorySource {
            name: "bitnami".into(),
            url: server.uri(),
        };

        let status = manager.add_repository(&source, &mut file).await.unwrap();
        assert_eq!(status, RepositoryStatus::Added);
        assert!(tmp.path().join("helm/cache/bitnami-index.yaml").exists());
        let persisted = RepositoryFile::load(&tmp.path().join("helm/repositories.yaml")).unwrap();
        assert!(persisted.has("bitnami"));

        // Second registration finds the entry and never hits the server again.
        let status = manager.add_repository(&source, &mut file).await.unwrap();
        assert_eq!(status, RepositoryStatus::Found);
    }

    #[tokio::test]
    async fn test_add_repository_rejects_invalid_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("entries: {}\n"))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let manager = manager(tmp.path());
        let mut file = manager.assure_repository_config().await.unwrap().into_inner();
        let source = RepositorySource {
            name: "broken".into(),
            url: server.uri(),
        };

        let err = manager.add_repository(&source, &mut file).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!file.has("broken"));
        let persisted = RepositoryFile::load(&tmp.path().join("helm/repositories.yaml")).unwrap();
        assert!(!persisted.has("broken"));
    }
}
