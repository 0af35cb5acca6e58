//! `Cluster` singleton describing the DeviceChain installation.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of the singleton `Cluster` record created by `install core`.
pub const CLUSTER_NAME: &str = "devicechain";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(group = "core.devicechain.io", version = "v1beta1", kind = "Cluster")]
#[kube(shortname = "dcc")]
#[kube(derive = "PartialEq")]
#[kube(printcolumn = r#"{"name":"Domain","type":"string","jsonPath":".spec.domain"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Base domain instances are exposed under.
    pub domain: String,
    pub name: String,
    pub description: String,
}
