//! DeviceChain custom resource definitions (`core.devicechain.io/v1beta1`).

mod cluster;
mod configuration;
mod instance;
mod microservice;
mod tenant;

pub use cluster::{Cluster, ClusterSpec, CLUSTER_NAME};
pub use configuration::{
    InstanceConfiguration, InstanceConfigurationSpec, MicroserviceConfiguration,
    MicroserviceConfigurationSpec,
};
pub use instance::{Instance, InstanceSpec};
pub use microservice::{Microservice, MicroserviceSpec, IMAGE_PULL_POLICY_ALWAYS};
pub use tenant::{
    tenant_microservice_id, Tenant, TenantMicroservice, TenantMicroserviceSpec, TenantSpec,
};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};

/// API group of every DeviceChain resource.
pub const GROUP: &str = "core.devicechain.io";

/// Label carrying the owning tenant id.
pub const LABEL_TENANT: &str = "devicechain.io.tenant";

/// Label carrying the referenced microservice id.
pub const LABEL_MICROSERVICE: &str = "devicechain.io.microservice";

/// Opaque configuration payload attached to templates and entities.
pub type EntityConfiguration = serde_json::Value;

/// Schema for [`EntityConfiguration`]: any JSON object, kept verbatim by the API server.
pub(crate) fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..SchemaObject::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}

pub(crate) fn empty_configuration() -> EntityConfiguration {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Generated definitions for every DeviceChain kind, in install order.
#[must_use]
pub fn definitions() -> Vec<CustomResourceDefinition> {
    vec![
        Cluster::crd(),
        InstanceConfiguration::crd(),
        Instance::crd(),
        MicroserviceConfiguration::crd(),
        Microservice::crd(),
        Tenant::crd(),
        TenantMicroservice::crd(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_share_group_and_version() {
        for crd in definitions() {
            assert_eq!(crd.spec.group, GROUP);
            assert_eq!(crd.spec.versions.len(), 1);
            assert_eq!(crd.spec.versions[0].name, "v1beta1");
        }
    }

    #[test]
    fn test_scopes() {
        let scope = |name: &str| {
            definitions()
                .into_iter()
                .find(|crd| crd.spec.names.kind == name)
                .map(|crd| crd.spec.scope)
        };
        assert_eq!(scope("Instance").as_deref(), Some("Cluster"));
        assert_eq!(scope("InstanceConfiguration").as_deref(), Some("Cluster"));
        assert_eq!(scope("Tenant").as_deref(), Some("Namespaced"));
        assert_eq!(scope("TenantMicroservice").as_deref(), Some("Namespaced"));
    }

    #[test]
    fn test_configuration_schema_preserves_unknown_fields() {
        let crd = Instance::crd();
        let schema = serde_json::to_value(&crd.spec.versions[0].schema).unwrap();
        let configuration =
            &schema["openAPIV3Schema"]["properties"]["spec"]["properties"]["configuration"];
        assert_eq!(configuration["x-kubernetes-preserve-unknown-fields"], true);
        assert_eq!(configuration["type"], "object");
    }
}
