//! Helm repository configuration (`repositories.yaml`) and repository indexes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dc_k8s::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Contents of helm's `repositories.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryFile {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(default)]
    pub generated: String,
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
}

/// One registered repository. Fields this tool does not manage
/// (credentials, TLS files) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl RepositoryEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            extra: BTreeMap::new(),
        }
    }
}

impl Default for RepositoryFile {
    fn default() -> Self {
        Self {
            api_version: "v1".to_string(),
            generated: chrono::Utc::now().to_rfc3339(),
            repositories: Vec::new(),
        }
    }
}

impl RepositoryFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Write the file, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        debug!(path = %path.display(), repositories = self.repositories.len(), "Wrote repository file");
        Ok(())
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.repositories.iter().any(|r| r.name == name)
    }

    /// Insert an entry, replacing any entry with the same name.
    pub fn update(&mut self, entry: RepositoryEntry) {
        match self.repositories.iter_mut().find(|r| r.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.repositories.push(entry),
        }
    }
}

/// A repository `index.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexFile {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<ChartVersion>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartVersion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

impl IndexFile {
    /// Parse and validate an index document.
    pub fn parse(content: &str) -> Result<Self> {
        let index: Self = serde_yaml::from_str(content)
            .map_err(|e| Error::validation(format!("invalid repository index: {e}")))?;
        if index.api_version.is_empty() {
            return Err(Error::validation("invalid repository index: no API version specified"));
        }
        for (chart, versions) in &index.entries {
            if let Some(bad) = versions.iter().find(|v| v.version.is_empty()) {
                return Err(Error::validation(format!(
                    "invalid repository index: chart '{chart}' has an entry without a version ({})",
                    bad.name
                )));
            }
        }
        Ok(index)
    }

    /// Number of chart versions listed.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Location of `index.yaml` below a repository URL.
#[must_use]
pub fn index_url(repository_url: &str) -> String {
    format!("{}/index.yaml", repository_url.trim_end_matches('/'))
}

/// Cache path of a repository's downloaded index.
#[must_use]
pub fn cache_path(cache_dir: &Path, name: &str) -> PathBuf {
    cache_dir.join(format!("{name}-index.yaml"))
}

/// Download and validate a repository index, returning the raw document.
pub async fn fetch_index(http: &reqwest::Client, repository_url: &str) -> Result<(IndexFile, String)> {
    let url = index_url(repository_url);
    debug!(url = %url, "Downloading repository index");
    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::transport(format!("failed to fetch {url}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::transport(format!("failed to fetch {url}: HTTP {status}")));
    }
    let body = response
        .text()
        .await
        .map_err(|e| Error::transport(format!("failed to read {url}: {e}")))?;
    let index = IndexFile::parse(&body)?;
    Ok((index, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INDEX: &str = r"apiVersion: v1
entries:
  redis:
  - name: redis
    version: 17.3.0
    urls:
    - https://charts.example.com/redis-17.3.0.tgz
  - name: redis
    version: 17.2.0
";

    #[test]
    fn test_repository_file_round_trip_keeps_unknown_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("helm/repositories.yaml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "apiVersion: \"\"\ngenerated: \"2024-01-01T00:00:00Z\"\nrepositories:\n- name: stable\n  url: https://charts.example.com\n  insecure_skip_tls_verify: true\n",
        )
        .unwrap();

        let mut file = RepositoryFile::load(&path).unwrap();
        assert!(file.has("stable"));
        file.update(RepositoryEntry::new("bitnami", "https://charts.bitnami.com/bitnami"));
        file.write(&path).unwrap();

        let reloaded = RepositoryFile::load(&path).unwrap();
        assert_eq!(reloaded.repositories.len(), 2);
        assert_eq!(
            reloaded.repositories[0].extra.get("insecure_skip_tls_verify"),
            Some(&serde_yaml::Value::Bool(true))
        );
    }

    #[test]
    fn test_update_replaces_by_name() {
        let mut file = RepositoryFile::default();
        file.update(RepositoryEntry::new("a", "https://one"));
        file.update(RepositoryEntry::new("a", "https://two"));
        assert_eq!(file.repositories.len(), 1);
        assert_eq!(file.repositories[0].url, "https://two");
    }

    #[test]
    fn test_index_url_and_cache_path() {
        assert_eq!(
            index_url("https://k8s-at-home.com/charts/"),
            "https://k8s-at-home.com/charts/index.yaml"
        );
        assert_eq!(
            cache_path(Path::new("/cache"), "bitnami"),
            PathBuf::from("/cache/bitnami-index.yaml")
        );
    }

    #[test]
    fn test_index_requires_api_version() {
        let err = IndexFile::parse("entries: {}\n").unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("no API version")));
        assert!(matches!(IndexFile::parse("<html>"), Err(Error::Validation(_))));
        assert_eq!(IndexFile::parse(INDEX).unwrap().version_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/charts/index.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(INDEX))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let (index, raw) = fetch_index(&http, &format!("{}/charts/", server.uri()))
            .await
            .unwrap();
        assert!(index.entries.contains_key("redis"));
        assert_eq!(raw, INDEX);
    }

    #[tokio::test]
    async fn test_fetch_index_http_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetch_index(&reqwest::Client::new(), &server.uri())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
