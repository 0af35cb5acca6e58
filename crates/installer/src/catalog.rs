//! Resource catalog.
//!
//! Discovers installable files in the bundle tree: CRD, RBAC and operator
//! manifests, chart descriptors and plain pre/post-install resources.
//! Traversal is sorted by file name so every run sees the same order.
//! Packaging artifacts (files whose name starts with `kust`) are skipped.

use std::path::{Path, PathBuf};

use dc_k8s::{Error, Result};
use tracing::debug;
use walkdir::WalkDir;

/// Reserved prefix of packaging-tool files (`kustomization.yaml`).
pub const EXCLUDED_PREFIX: &str = "kust";

/// One of the bundles shipped under the bundle root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bundle {
    Crds,
    Rbac,
    Operator,
    Charts,
    Preinstall,
    Resources,
}

impl Bundle {
    /// Directory of the bundle below the root.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Crds => "crds",
            Self::Rbac => "rbac",
            Self::Operator => "operator",
            Self::Charts => "charts",
            Self::Preinstall => "preinstall",
            Self::Resources => "resources",
        }
    }
}

impl std::fmt::Display for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A file discovered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub file_name: String,
    pub path: PathBuf,
}

impl CatalogEntry {
    /// Read the file contents.
    pub fn read(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }

    /// File name without its extension, e.g. `role` for `role.yaml`.
    #[must_use]
    pub fn stem(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map_or(self.file_name.as_str(), |(stem, _)| stem)
    }
}

/// Read-only view of a bundle tree.
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    root: PathBuf,
}

impl ResourceCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Entries of a bundle in traversal order.
    ///
    /// # Errors
    ///
    /// `NotFound` if the bundle directory is missing.
    pub fn entries(&self, bundle: Bundle) -> Result<Vec<CatalogEntry>> {
        let dir = self.root.join(bundle.dir_name());
        if !dir.is_dir() {
            return Err(Error::not_found("Bundle", None, &dir.display().to_string()));
        }
        walk(&dir)
    }
}

/// Every file below `dir`, sorted by name at each level, minus packaging artifacts.
pub fn walk(dir: &Path) -> Result<Vec<CatalogEntry>> {
    let mut entries = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded(&e.file_name().to_string_lossy()));

    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        debug!(file = %file_name, "Catalog entry");
        entries.push(CatalogEntry {
            file_name,
            path: entry.into_path(),
        });
    }
    Ok(entries)
}

fn is_excluded(file_name: &str) -> bool {
    file_name.starts_with(EXCLUDED_PREFIX)
}

/// Split a catalog file name on `_` after dropping `suffix`, requiring
/// exactly `expected` tokens.
pub fn split_file_name<'a>(file_name: &'a str, suffix: &str, expected: usize) -> Result<Vec<&'a str>> {
    let base = file_name.strip_suffix(suffix).unwrap_or(file_name);
    let parts: Vec<&str> = base.split('_').collect();
    if parts.len() != expected {
        return Err(Error::validation(format!(
            "invalid catalog file name '{file_name}': expected {expected} '_'-separated parts, found {}",
            parts.len()
        )));
    }
    Ok(parts)
}

/// Display name of a `<order>_<display-name>.yaml` resource file.
///
/// `01_kafka-topics.yaml` becomes `Kafka Topics`.
pub fn display_name(file_name: &str) -> Result<String> {
    let parts = split_file_name(file_name, ".yaml", 2)?;
    Ok(title_case(&parts[1].replace('-', " ")))
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
