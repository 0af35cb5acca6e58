//! Chart metadata checks run before installing a pulled chart.

use std::path::Path;

use dc_k8s::{Error, Result};
use serde::Deserialize;

/// The parts of `Chart.yaml` needed to decide installability.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// `application`, `library` or empty.
    #[serde(rename = "type", default)]
    pub chart_type: String,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartDependency {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
}

impl ChartMetadata {
    /// Load `Chart.yaml` from an unpacked chart directory.
    pub fn load(chart_dir: &Path) -> Result<Self> {
        let path = chart_dir.join("Chart.yaml");
        let content = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::validation(format!("invalid {}: {e}", path.display())))
    }

    /// Only application charts (or charts without a type) can be installed.
    pub fn ensure_installable(&self) -> Result<()> {
        match self.chart_type.as_str() {
            "" | "application" => Ok(()),
            other => Err(Error::UnsupportedResource(format!(
                "{other} charts are not installable ({})",
                self.name
            ))),
        }
    }

    /// Declared dependencies with no counterpart under `charts/`.
    pub fn missing_dependencies(&self, chart_dir: &Path) -> Result<Vec<String>> {
        if self.dependencies.is_empty() {
            return Ok(Vec::new());
        }
        let present = vendored_charts(&chart_dir.join("charts"))?;
        Ok(self
            .dependencies
            .iter()
            .filter(|dep| !present.contains(&dep.name))
            .map(|dep| dep.name.clone())
            .collect())
    }
}

/// Names of charts vendored in a `charts/` directory, either unpacked or as
/// `<name>-<version>.tgz` archives.
fn vendored_charts(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            match ChartMetadata::load(&path) {
                Ok(meta) => names.push(meta.name),
                Err(_) => names.push(entry.file_name().to_string_lossy().into_owned()),
            }
        } else if let Some(archive) = entry.file_name().to_string_lossy().strip_suffix(".tgz") {
            if let Some(name) = archive_chart_name(archive) {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

/// Chart name of a `<name>-<version>` archive stem. The version starts at the
/// first `-` followed by a digit, so pre-release suffixes stay in the version.
fn archive_chart_name(stem: &str) -> Option<&str> {
    stem.char_indices()
        .find(|&(i, c)| {
            c == '-'
                && stem[i + 1..]
                    .chars()
                    .next()
                    .is_some_and(|next| next.is_ascii_digit())
        })
        .map(|(i, _)| &stem[..i])
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn chart(dir: &Path, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("Chart.yaml"), body).unwrap();
    }

    #[test]
    fn test_application_and_untyped_charts_are_installable() {
        let tmp = tempfile::tempdir().unwrap();
        chart(tmp.path(), "apiVersion: v2\nname: redis\nversion: 17.3.0\ntype: application\n");
        assert!(ChartMetadata::load(tmp.path()).unwrap().ensure_installable().is_ok());

        chart(tmp.path(), "apiVersion: v1\nname: mosquitto\nversion: 4.8.2\n");
        assert!(ChartMetadata::load(tmp.path()).unwrap().ensure_installable().is_ok());
    }

    #[test]
    fn test_library_chart_is_unsupported() {
        let tmp = tempfile::tempdir().unwrap();
        chart(tmp.path(), "apiVersion: v2\nname: common\nversion: 2.2.1\ntype: library\n");
        let err = ChartMetadata::load(tmp.path())
            .unwrap()
            .ensure_installable()
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedResource(ref m) if m.starts_with("library charts")));
    }

    #[test]
    fn test_missing_dependencies() {
        let tmp = tempfile::tempdir().unwrap();
        chart(
            tmp.path(),
            "apiVersion: v2\nname: postgresql\nversion: 12.1.0\ndependencies:\n- name: common\n  version: 2.x.x\n  repository: oci://registry/bitnamicharts\n- name: metrics\n- name: vendored\n",
        );
        fs::create_dir_all(tmp.path().join("charts")).unwrap();
        fs::write(tmp.path().join("charts/common-2.2.1-beta.1.tgz"), b"").unwrap();
        chart(&tmp.path().join("charts/vendored"), "name: vendored\n");

        let meta = ChartMetadata::load(tmp.path()).unwrap();
        assert_eq!(meta.missing_dependencies(tmp.path()).unwrap(), vec!["metrics"]);
    }

    #[test]
    fn test_archive_chart_name() {
        assert_eq!(archive_chart_name("common-2.2.1"), Some("common"));
        assert_eq!(archive_chart_name("common-2.2.1-beta.1"), Some("common"));
        assert_eq!(archive_chart_name("timescaledb-single-0.33.1"), Some("timescaledb-single"));
        assert_eq!(archive_chart_name("no-version"), None);
    }

    #[test]
    fn test_no_dependencies_needs_no_charts_dir() {
        let tmp = tempfile::tempdir().unwrap();
        chart(tmp.path(), "name: redis\n");
        let meta = ChartMetadata::load(tmp.path()).unwrap();
        assert!(meta.missing_dependencies(tmp.path()).unwrap().is_empty());
    }
}
