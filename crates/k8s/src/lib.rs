//! DeviceChain control-plane library.
//!
//! Custom resource types for the DeviceChain entity hierarchy, the
//! [`ControlPlane`] access trait with its Kubernetes implementation, and the
//! [`HierarchyManager`] that creates and resolves instances, tenants,
//! microservices and their bindings.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dc_k8s::{HierarchyManager, KubeControlPlane};
//!
//! #[tokio::main]
//! async fn main() -> dc_k8s::Result<()> {
//!     let client = Arc::new(KubeControlPlane::try_default("dcctl").await?);
//!     let hierarchy = HierarchyManager::new(client);
//!     let tenant = hierarchy.get_tenant("dc1", "tenant1").await?;
//!     println!("{:?}", tenant.spec);
//!     Ok(())
//! }
//! ```

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

pub mod client;
pub mod crds;
pub mod error;
pub mod hierarchy;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::{AppliedObject, ControlPlane, KubeControlPlane};
pub use error::{Error, Result};
pub use hierarchy::{
    Assured, HierarchyManager, InstanceCreateRequest, MicroserviceCreateRequest,
    TenantCreateRequest,
};
