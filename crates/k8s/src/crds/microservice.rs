//! `Microservice` custom resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{empty_configuration, preserve_unknown_fields, EntityConfiguration};

/// Pull policy stamped on every microservice.
pub const IMAGE_PULL_POLICY_ALWAYS: &str = "Always";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(group = "core.devicechain.io", version = "v1beta1", kind = "Microservice")]
#[kube(namespaced)]
#[kube(shortname = "dcm")]
#[kube(derive = "PartialEq")]
#[kube(printcolumn = r#"{"name":"Area","type":"string","jsonPath":".spec.functionalArea"}"#)]
#[kube(printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceSpec {
    pub name: String,
    pub description: String,
    pub functional_area: String,
    pub image: String,
    pub image_pull_policy: String,
    pub config_id: String,
    #[serde(default = "empty_configuration")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub configuration: EntityConfiguration,
}
