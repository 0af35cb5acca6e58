//! `Instance` custom resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{empty_configuration, preserve_unknown_fields, EntityConfiguration};

/// A DeviceChain instance. Owns a namespace named after the instance id.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(group = "core.devicechain.io", version = "v1beta1", kind = "Instance")]
#[kube(shortname = "dci")]
#[kube(derive = "PartialEq")]
#[kube(printcolumn = r#"{"name":"Name","type":"string","jsonPath":".spec.name"}"#)]
#[kube(printcolumn = r#"{"name":"Config","type":"string","jsonPath":".spec.configId"}"#)]
#[kube(printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    pub name: String,
    pub description: String,
    /// Id of the `InstanceConfiguration` the payload was copied from.
    pub config_id: String,
    /// Snapshot of the template payload taken at creation time.
    #[serde(default = "empty_configuration")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub configuration: EntityConfiguration,
}
