//! Configuration templates copied into instances and microservices.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{empty_configuration, preserve_unknown_fields, EntityConfiguration};

/// Template for instance-level infrastructure settings.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "core.devicechain.io",
    version = "v1beta1",
    kind = "InstanceConfiguration"
)]
#[kube(shortname = "dcic")]
#[kube(derive = "PartialEq")]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfigurationSpec {
    #[serde(default = "empty_configuration")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub configuration: EntityConfiguration,
}

/// Template for a microservice: functional area, image and settings.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "core.devicechain.io",
    version = "v1beta1",
    kind = "MicroserviceConfiguration"
)]
#[kube(shortname = "dcmc")]
#[kube(derive = "PartialEq")]
#[kube(printcolumn = r#"{"name":"Area","type":"string","jsonPath":".spec.functionalArea"}"#)]
#[kube(printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceConfigurationSpec {
    pub functional_area: String,
    pub image: String,
    #[serde(default = "empty_configuration")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub configuration: EntityConfiguration,
}
