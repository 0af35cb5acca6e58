//! Provisioning phases and run state.
//!
//! A run executes a fixed list of phases in order. The run state advances
//! after each successful phase and becomes `Failed` on the first error,
//! which is terminal: a new attempt is a new invocation.

/// What a provisioning run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    InstallCore,
    InstallInfra,
    UninstallInfra,
}

impl RunKind {
    /// Phases of this run, in execution order.
    #[must_use]
    pub fn phases(self) -> &'static [Phase] {
        match self {
            Self::InstallCore => &[
                Phase::AssureNamespace,
                Phase::InstallCrds,
                Phase::AssureClusterResource,
                Phase::InstallRbac,
                Phase::InstallOperator,
                Phase::ApplyGeneratedInstanceResources,
            ],
            Self::InstallInfra => &[
                Phase::AssureNamespace,
                Phase::AssureHelmRepositoryConfig,
                Phase::AddHelmRepositories,
                Phase::ApplyPreinstallResources,
                Phase::InstallHelmReleases,
                Phase::ApplyInfraResources,
            ],
            Self::UninstallInfra => &[Phase::UninstallHelmReleases],
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::InstallCore => "Installing DeviceChain core components",
            Self::InstallInfra => "Installing DeviceChain infrastructure",
            Self::UninstallInfra => "Uninstalling DeviceChain infrastructure",
        }
    }
}

/// One ordered, fail-fast step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AssureNamespace,
    InstallCrds,
    AssureClusterResource,
    InstallRbac,
    InstallOperator,
    ApplyGeneratedInstanceResources,
    AssureHelmRepositoryConfig,
    AddHelmRepositories,
    ApplyPreinstallResources,
    InstallHelmReleases,
    ApplyInfraResources,
    UninstallHelmReleases,
}

impl Phase {
    /// Get a human-readable description of the phase.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::AssureNamespace => "Verifying system namespace",
            Self::InstallCrds => "Installing custom resource definitions",
            Self::AssureClusterResource => "Verifying cluster resource",
            Self::InstallRbac => "Installing RBAC resources",
            Self::InstallOperator => "Installing operator",
            Self::ApplyGeneratedInstanceResources => "Applying generated instance resources",
            Self::AssureHelmRepositoryConfig => "Verifying Helm repository configuration",
            Self::AddHelmRepositories => "Adding Helm repositories",
            Self::ApplyPreinstallResources => "Applying preinstall resources",
            Self::InstallHelmReleases => "Installing Helm releases",
            Self::ApplyInfraResources => "Applying infrastructure resources",
            Self::UninstallHelmReleases => "Uninstalling Helm releases",
        }
    }

    /// State reached once this phase succeeds.
    #[must_use]
    pub fn reached(self) -> RunState {
        match self {
            Self::AssureNamespace => RunState::NamespaceVerified,
            Self::InstallCrds => RunState::CrdsInstalled,
            Self::AssureClusterResource => RunState::ClusterResourceVerified,
            Self::InstallRbac => RunState::RbacInstalled,
            Self::InstallOperator => RunState::OperatorInstalled,
            Self::ApplyGeneratedInstanceResources
            | Self::ApplyPreinstallResources
            | Self::ApplyInfraResources => RunState::ResourcesApplied,
            Self::AssureHelmRepositoryConfig => RunState::RepositoryConfigVerified,
            Self::AddHelmRepositories => RunState::RepositoriesAdded,
            Self::InstallHelmReleases => RunState::ReleasesInstalled,
            Self::UninstallHelmReleases => RunState::ReleasesUninstalled,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Progress of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    NamespaceVerified,
    CrdsInstalled,
    ClusterResourceVerified,
    RbacInstalled,
    OperatorInstalled,
    RepositoryConfigVerified,
    RepositoriesAdded,
    ReleasesInstalled,
    ReleasesUninstalled,
    ResourcesApplied,
    Complete,
    /// Terminal. Records the phase that failed.
    Failed(Phase),
}

impl RunState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed(_))
    }
}
