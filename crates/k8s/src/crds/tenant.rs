//! `Tenant` and `TenantMicroservice` custom resources.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{empty_configuration, preserve_unknown_fields, EntityConfiguration};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(group = "core.devicechain.io", version = "v1beta1", kind = "Tenant")]
#[kube(namespaced)]
#[kube(shortname = "dct")]
#[kube(derive = "PartialEq")]
#[kube(printcolumn = r#"{"name":"Name","type":"string","jsonPath":".spec.name"}"#)]
#[serde(rename_all = "camelCase")]
pub struct TenantSpec {
    pub name: String,
    pub description: String,
}

/// Binds a microservice to a tenant within an instance namespace.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "core.devicechain.io",
    version = "v1beta1",
    kind = "TenantMicroservice"
)]
#[kube(namespaced)]
#[kube(shortname = "dctm")]
#[kube(derive = "PartialEq")]
#[kube(printcolumn = r#"{"name":"Tenant","type":"string","jsonPath":".spec.tenantId"}"#)]
#[kube(printcolumn = r#"{"name":"Microservice","type":"string","jsonPath":".spec.microserviceId"}"#)]
#[serde(rename_all = "camelCase")]
pub struct TenantMicroserviceSpec {
    pub tenant_id: String,
    pub microservice_id: String,
    #[serde(default = "empty_configuration")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub configuration: EntityConfiguration,
}

/// Resource name of the binding between `tenant_id` and `microservice_id`.
#[must_use]
pub fn tenant_microservice_id(tenant_id: &str, microservice_id: &str) -> String {
    format!("tms-{tenant_id}-{microservice_id}")
}
