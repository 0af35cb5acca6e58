//! Reconciliation driver.
//!
//! Runs the phases of an install or uninstall run in order against the
//! resource catalog, the control plane and the chart release manager.
//! Execution is strictly sequential. The first failing item stops its phase
//! and the run; anything applied before the failure stays in place.

use std::path::Path;
use std::sync::Arc;

use dc_k8s::crds::ClusterSpec;
use dc_k8s::{ControlPlane, Error, HierarchyManager, Result};
use tracing::{debug, error, info, warn};

use crate::catalog::{self, Bundle, CatalogEntry, ResourceCatalog};
use crate::config::{InstallConfig, SYSTEM_NAMESPACE};
use crate::helm::{
    load_overrides, ChartDescriptor, ChartReleases, RepositoryFile, RepositoryStatus,
    UninstallOutcome,
};
use crate::state::{Phase, RunKind, RunState};
use crate::ui;

/// Drives one provisioning run.
pub struct ReconciliationDriver<'a> {
    config: &'a InstallConfig,
    catalog: ResourceCatalog,
    control_plane: Arc<dyn ControlPlane>,
    hierarchy: HierarchyManager,
    charts: &'a dyn ChartReleases,
    cluster: ClusterSpec,
    repositories: Option<RepositoryFile>,
    state: RunState,
}

impl<'a> ReconciliationDriver<'a> {
    pub fn new(
        config: &'a InstallConfig,
        control_plane: Arc<dyn ControlPlane>,
        charts: &'a dyn ChartReleases,
    ) -> Self {
        Self {
            config,
            catalog: ResourceCatalog::new(&config.bundle_dir),
            hierarchy: HierarchyManager::new(control_plane.clone()),
            control_plane,
            charts,
            cluster: default_cluster(),
            repositories: None,
            state: RunState::Idle,
        }
    }

    /// Cluster record created by `install core` when none exists.
    #[must_use]
    pub fn with_cluster(mut self, cluster: ClusterSpec) -> Self {
        self.cluster = cluster;
        self
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute every phase of `kind`, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing phase; the driver is left in
    /// `RunState::Failed` for that phase.
    pub async fn run(&mut self, kind: RunKind) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::validation("driver has already completed a run"));
        }

        ui::print_section(kind.title());
        let phases = kind.phases();
        for (index, phase) in phases.iter().copied().enumerate() {
            ui::print_progress_step(index + 1, phases.len(), phase.description());
            info!(phase = ?phase, "Executing phase");

            if let Err(e) = self.execute(phase).await {
                self.state = RunState::Failed(phase);
                error!(phase = ?phase, error = %e, "Provisioning run failed");
                ui::print_error(&format!("Failed while {}: {e}", phase.description().to_lowercase()));
                return Err(e);
            }
            self.state = phase.reached();
            debug!(state = ?self.state, "Phase complete");
        }

        self.state = RunState::Complete;
        ui::print_success("Run completed successfully.");
        Ok(())
    }

    async fn execute(&mut self, phase: Phase) -> Result<()> {
        match phase {
            Phase::AssureNamespace => self.assure_namespace().await,
            Phase::InstallCrds => self.apply_bundle(Bundle::Crds, "Installed CRD").await,
            Phase::AssureClusterResource => self.assure_cluster().await,
            Phase::InstallRbac => self.apply_bundle(Bundle::Rbac, "Installed RBAC").await,
            Phase::InstallOperator => {
                self.apply_bundle(Bundle::Operator, "Installed operator component")
                    .await
            }
            Phase::ApplyGeneratedInstanceResources => self.apply_generated_resources().await,
            Phase::AssureHelmRepositoryConfig => self.assure_repository_config().await,
            Phase::AddHelmRepositories => self.add_repositories().await,
            Phase::ApplyPreinstallResources => {
                self.apply_named_resources(Bundle::Preinstall, "Preinstalled")
                    .await
            }
            Phase::InstallHelmReleases => self.install_releases().await,
            Phase::ApplyInfraResources => {
                self.apply_named_resources(Bundle::Resources, "Installed")
                    .await
            }
            Phase::UninstallHelmReleases => self.uninstall_releases().await,
        }
    }

    async fn assure_namespace(&self) -> Result<()> {
        let namespace = SYSTEM_NAMESPACE;
        if self.hierarchy.assure_namespace(namespace).await?.was_created() {
            ui::print_progress(&format!("Created namespace {namespace}"));
        } else {
            ui::print_progress(&format!("Namespace {namespace} already exists"));
        }
        Ok(())
    }

    async fn assure_cluster(&self) -> Result<()> {
        let cluster = self.hierarchy.assure_cluster(self.cluster.clone()).await?;
        let created = cluster.was_created();
        let spec = cluster.into_inner().spec;
        if created {
            ui::print_progress(&format!("Created cluster resource for {}", spec.domain));
        } else {
            ui::print_progress(&format!("Found cluster resource for {}", spec.domain));
        }
        Ok(())
    }

    async fn apply_entry(&self, entry: &CatalogEntry) -> Result<()> {
        let manifest = entry.read()?;
        let applied = self.control_plane.apply(&manifest).await?;
        debug!(file = %entry.file_name, objects = applied.len(), "Applied catalog entry");
        Ok(())
    }

    async fn apply_bundle(&self, bundle: Bundle, label: &str) -> Result<()> {
        for entry in self.catalog.entries(bundle)? {
            self.apply_entry(&entry).await?;
            ui::print_progress(&format!("{label}: {}", entry.stem()));
        }
        Ok(())
    }

    async fn apply_generated_resources(&self) -> Result<()> {
        let dir = &self.config.resources_dir;
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Generated resources directory missing");
            ui::print_warning(&format!(
                "No generated resources found in {} (run `dcctl resgen` first)",
                dir.display()
            ));
            return Ok(());
        }
        for entry in catalog::walk(dir)? {
            self.apply_entry(&entry).await?;
            ui::print_progress(&format!("Installed resource: {}", relative(dir, &entry.path)));
        }
        Ok(())
    }

    /// Pre/post-install resources named `<order>_<display-name>.yaml`.
    async fn apply_named_resources(&self, bundle: Bundle, label: &str) -> Result<()> {
        for entry in self.catalog.entries(bundle)? {
            let name = catalog::display_name(&entry.file_name)?;
            self.apply_entry(&entry).await?;
            ui::print_progress(&format!("{label} {name}"));
        }
        Ok(())
    }

    async fn assure_repository_config(&mut self) -> Result<()> {
        let file = self.charts.assure_repository_config().await?;
        let path = self.config.helm.repository_config.display().to_string();
        if file.was_created() {
            ui::print_progress(&format!("Created Helm repository configuration at {path}"));
        } else {
            ui::print_progress(&format!("Using Helm repository configuration at {path}"));
        }
        self.repositories = Some(file.into_inner());
        Ok(())
    }

    async fn add_repositories(&mut self) -> Result<()> {
        let mut file = self
            .repositories
            .take()
            .ok_or_else(|| Error::validation("Helm repository configuration not loaded"))?;
        for source in &self.config.repositories {
            let status = self.charts.add_repository(source, &mut file).await?;
            let label = format!("Helm repository {} ({})", source.name, source.url);
            match status {
                RepositoryStatus::Found => ui::print_status(&label, "FOUND", false),
                RepositoryStatus::Added => ui::print_status(&label, "ADDED", true),
            }
        }
        self.repositories = Some(file);
        Ok(())
    }

    fn chart_descriptor(&self, entry: &CatalogEntry) -> Result<ChartDescriptor> {
        ChartDescriptor::parse(&entry.file_name, &self.config.release_prefix)
    }

    async fn install_releases(&self) -> Result<()> {
        for entry in self.catalog.entries(Bundle::Charts)? {
            let descriptor = self.chart_descriptor(&entry)?;
            let overrides = load_overrides(&entry.path)?;

            // Releases are recreated, never upgraded.
            if let Err(e) = self.charts.uninstall_release(&descriptor).await {
                warn!(release = %descriptor.release_name, error = %e, "Ignoring uninstall failure");
            }
            self.charts.install_release(&descriptor, &overrides).await?;
            ui::print_progress(&format!("Installed Helm release {descriptor}"));
        }
        Ok(())
    }

    async fn uninstall_releases(&self) -> Result<()> {
        for entry in self.catalog.entries(Bundle::Charts)? {
            let descriptor = self.chart_descriptor(&entry)?;
            match self.charts.uninstall_release(&descriptor).await? {
                UninstallOutcome::Removed => ui::print_progress(&format!(
                    "Uninstalled Helm release {}",
                    descriptor.release_name
                )),
                UninstallOutcome::NotInstalled => ui::print_progress(&format!(
                    "Helm release {} not installed",
                    descriptor.release_name
                )),
            }
        }
        Ok(())
    }
}

fn relative(base: &Path, path: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}

/// Cluster record used when `install core` is given no overrides.
#[must_use]
pub fn default_cluster() -> ClusterSpec {
    ClusterSpec {
        domain: "devicechain.local".to_string(),
        name: "DeviceChain".to_string(),
        description: "DeviceChain cluster".to_string(),
    }
}
