//! DeviceChain installer library.
//!
//! Provisions the DeviceChain control plane into a Kubernetes cluster and
//! manages the instance/tenant/microservice hierarchy within it. The same
//! operations back the `dcctl` binary.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dcctl::{helm::ChartReleaseManager, InstallConfig, ReconciliationDriver, RunKind};
//! use dc_k8s::KubeControlPlane;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = InstallConfig::with_defaults();
//!     let control_plane = Arc::new(KubeControlPlane::try_default("dcctl").await?);
//!     let charts = ChartReleaseManager::new(&config)?;
//!     let mut driver = ReconciliationDriver::new(&config, control_plane, &charts);
//!     driver.run(RunKind::InstallCore).await?;
//!     Ok(())
//! }
//! ```

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

pub mod bootstrap;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod graphql;
pub mod helm;
pub mod orchestrator;
pub mod resgen;
pub mod state;
pub mod ui;

// Re-export commonly used types at the crate root
pub use config::InstallConfig;
pub use orchestrator::ReconciliationDriver;
pub use state::{Phase, RunKind, RunState};
