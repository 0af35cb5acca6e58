//! DeviceChain entity hierarchy.
//!
//! `Instance → {Tenant, Microservice} → TenantMicroservice`, all scoped to a
//! namespace named after the instance. Every `create_*` here is a strict
//! create: an existing identity fails with `AlreadyExists` and nothing is
//! written. Configuration payloads are copied from their template at creation
//! time, so later template edits never reach existing entities.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Namespace;
use kube::api::{DynamicObject, ObjectMeta};
use kube::core::ApiResource;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::client::ControlPlane;
use crate::crds::{
    tenant_microservice_id, Cluster, ClusterSpec, EntityConfiguration, Instance,
    InstanceConfiguration, InstanceConfigurationSpec, InstanceSpec, Microservice,
    MicroserviceConfiguration, MicroserviceConfigurationSpec, MicroserviceSpec, Tenant,
    TenantMicroservice, TenantMicroserviceSpec, TenantSpec, CLUSTER_NAME,
    IMAGE_PULL_POLICY_ALWAYS, LABEL_MICROSERVICE, LABEL_TENANT,
};
use crate::error::{Error, Result};

/// Outcome of an assure operation. Both variants are success.
#[derive(Debug, Clone, PartialEq)]
pub enum Assured<T> {
    /// The object was already present.
    Existing(T),
    /// The object was created by this call.
    Created(T),
}

impl<T> Assured<T> {
    #[must_use]
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Existing(inner) | Self::Created(inner) => inner,
        }
    }
}

/// Arguments for [`HierarchyManager::create_instance`].
#[derive(Debug, Clone)]
pub struct InstanceCreateRequest {
    pub id: String,
    pub name: String,
    pub description: String,
    pub config_id: String,
}

/// Arguments for [`HierarchyManager::create_tenant`].
#[derive(Debug, Clone)]
pub struct TenantCreateRequest {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Arguments for [`HierarchyManager::create_microservice`].
#[derive(Debug, Clone)]
pub struct MicroserviceCreateRequest {
    pub id: String,
    pub config_id: String,
    pub name: String,
    pub description: String,
}

/// Domain operations over the DeviceChain resources.
#[derive(Clone)]
pub struct HierarchyManager {
    client: Arc<dyn ControlPlane>,
}

impl HierarchyManager {
    pub fn new(client: Arc<dyn ControlPlane>) -> Self {
        Self { client }
    }

    /// Ensure a namespace exists.
    ///
    /// # Errors
    ///
    /// Propagates any failure other than the initial `NotFound`.
    pub async fn assure_namespace(&self, name: &str) -> Result<Assured<Namespace>> {
        require("namespace name", name)?;
        match self.fetch::<Namespace>(None, name).await {
            Ok(existing) => Ok(Assured::Existing(existing)),
            Err(e) if e.is_not_found() => {
                let namespace = Namespace {
                    metadata: ObjectMeta {
                        name: Some(name.to_string()),
                        ..ObjectMeta::default()
                    },
                    ..Namespace::default()
                };
                let created = self.insert(&namespace).await?;
                info!(namespace = name, "Created namespace");
                Ok(Assured::Created(created))
            }
            Err(e) => Err(e),
        }
    }

    /// Ensure the singleton `Cluster` record exists. An existing record is
    /// verified by lookup and left untouched.
    pub async fn assure_cluster(&self, spec: ClusterSpec) -> Result<Assured<Cluster>> {
        match self.fetch::<Cluster>(None, CLUSTER_NAME).await {
            Ok(existing) => Ok(Assured::Existing(existing)),
            Err(e) if e.is_not_found() => {
                let created = self.insert(&Cluster::new(CLUSTER_NAME, spec)).await?;
                info!(cluster = CLUSTER_NAME, "Created cluster resource");
                Ok(Assured::Created(created))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create_instance_configuration(
        &self,
        id: &str,
        configuration: EntityConfiguration,
    ) -> Result<InstanceConfiguration> {
        require("instance configuration id", id)?;
        let template = InstanceConfiguration::new(id, InstanceConfigurationSpec { configuration });
        self.insert(&template).await
    }

    pub async fn get_instance_configuration(&self, id: &str) -> Result<InstanceConfiguration> {
        require("instance configuration id", id)?;
        self.fetch(None, id).await
    }

    pub async fn create_microservice_configuration(
        &self,
        id: &str,
        spec: MicroserviceConfigurationSpec,
    ) -> Result<MicroserviceConfiguration> {
        require("microservice configuration id", id)?;
        self.insert(&MicroserviceConfiguration::new(id, spec)).await
    }

    pub async fn get_microservice_configuration(
        &self,
        id: &str,
    ) -> Result<MicroserviceConfiguration> {
        require("microservice configuration id", id)?;
        self.fetch(None, id).await
    }

    /// Create an instance from an `InstanceConfiguration` template, then make
    /// sure its namespace exists.
    ///
    /// # Errors
    ///
    /// `NotFound` when the template is missing, `AlreadyExists` when the id is taken.
    pub async fn create_instance(&self, request: &InstanceCreateRequest) -> Result<Instance> {
        require("instance id", &request.id)?;
        require("instance configuration id", &request.config_id)?;

        let template = self.get_instance_configuration(&request.config_id).await?;
        let instance = Instance::new(
            &request.id,
            InstanceSpec {
                name: request.name.clone(),
                description: request.description.clone(),
                config_id: request.config_id.clone(),
                configuration: template.spec.configuration.clone(),
            },
        );
        self.create(&instance).await?;
        info!(instance = %request.id, config = %request.config_id, "Created instance");

        self.assure_namespace(&request.id).await?;
        self.fetch(None, &request.id).await
    }

    pub async fn get_instance(&self, id: &str) -> Result<Instance> {
        require("instance id", id)?;
        self.fetch(None, id).await
    }

    pub async fn create_tenant(
        &self,
        instance_id: &str,
        request: &TenantCreateRequest,
    ) -> Result<Tenant> {
        let namespace = self.instance_namespace(instance_id).await?;
        require("tenant id", &request.id)?;

        let mut tenant = Tenant::new(
            &request.id,
            TenantSpec {
                name: request.name.clone(),
                description: request.description.clone(),
            },
        );
        tenant.metadata.namespace = Some(namespace);
        let created = self.insert(&tenant).await?;
        info!(instance = instance_id, tenant = %request.id, "Created tenant");
        Ok(created)
    }

    pub async fn get_tenant(&self, instance_id: &str, tenant_id: &str) -> Result<Tenant> {
        let namespace = self.instance_namespace(instance_id).await?;
        require("tenant id", tenant_id)?;
        self.fetch(Some(&namespace), tenant_id).await
    }

    /// Create a microservice from a `MicroserviceConfiguration` template.
    pub async fn create_microservice(
        &self,
        instance_id: &str,
        request: &MicroserviceCreateRequest,
    ) -> Result<Microservice> {
        let namespace = self.instance_namespace(instance_id).await?;
        require("microservice id", &request.id)?;
        require("microservice configuration id", &request.config_id)?;

        let template = self
            .get_microservice_configuration(&request.config_id)
            .await?;
        let mut microservice = Microservice::new(
            &request.id,
            MicroserviceSpec {
                name: request.name.clone(),
                description: request.description.clone(),
                functional_area: template.spec.functional_area.clone(),
                image: template.spec.image.clone(),
                image_pull_policy: IMAGE_PULL_POLICY_ALWAYS.to_string(),
                config_id: request.config_id.clone(),
                configuration: template.spec.configuration.clone(),
            },
        );
        microservice.metadata.namespace = Some(namespace);
        let created = self.insert(&microservice).await?;
        info!(instance = instance_id, microservice = %request.id, "Created microservice");
        Ok(created)
    }

    pub async fn get_microservice(
        &self,
        instance_id: &str,
        microservice_id: &str,
    ) -> Result<Microservice> {
        let namespace = self.instance_namespace(instance_id).await?;
        require("microservice id", microservice_id)?;
        self.fetch(Some(&namespace), microservice_id).await
    }

    pub async fn list_microservices(&self, instance_id: &str) -> Result<Vec<Microservice>> {
        let namespace = self.instance_namespace(instance_id).await?;
        self.list_in(&namespace, None).await
    }

    /// Bind a microservice to a tenant.
    ///
    /// Parents are checked in order (instance, tenant, microservice) and the
    /// first missing one is reported.
    pub async fn create_tenant_microservice(
        &self,
        instance_id: &str,
        tenant_id: &str,
        microservice_id: &str,
    ) -> Result<TenantMicroservice> {
        let namespace = self.instance_namespace(instance_id).await?;
        require("tenant id", tenant_id)?;
        let tenant: Tenant = self.fetch(Some(&namespace), tenant_id).await?;
        require("microservice id", microservice_id)?;
        let microservice: Microservice = self.fetch(Some(&namespace), microservice_id).await?;

        let name = tenant_microservice_id(tenant_id, microservice_id);
        let mut binding = TenantMicroservice::new(
            &name,
            TenantMicroserviceSpec {
                tenant_id: tenant_id.to_string(),
                microservice_id: microservice_id.to_string(),
                configuration: microservice.spec.configuration.clone(),
            },
        );
        binding.metadata.namespace = tenant.metadata.namespace.clone().or(Some(namespace));
        binding.metadata.labels = Some(BTreeMap::from([
            (LABEL_TENANT.to_string(), tenant_id.to_string()),
            (LABEL_MICROSERVICE.to_string(), microservice_id.to_string()),
        ]));
        let created = self.insert(&binding).await?;
        info!(
            instance = instance_id,
            tenant = tenant_id,
            microservice = microservice_id,
            name = %name,
            "Created tenant microservice"
        );
        Ok(created)
    }

    pub async fn get_tenant_microservice(
        &self,
        instance_id: &str,
        tenant_id: &str,
        microservice_id: &str,
    ) -> Result<TenantMicroservice> {
        let namespace = self.instance_namespace(instance_id).await?;
        require("tenant id", tenant_id)?;
        require("microservice id", microservice_id)?;
        let name = tenant_microservice_id(tenant_id, microservice_id);
        self.fetch(Some(&namespace), &name).await
    }

    /// All bindings of a tenant, found through the tenant label.
    pub async fn get_tenant_microservices_for_tenant(
        &self,
        instance_id: &str,
        tenant_id: &str,
    ) -> Result<Vec<TenantMicroservice>> {
        let tenant = self.get_tenant(instance_id, tenant_id).await?;
        let namespace = tenant
            .metadata
            .namespace
            .unwrap_or_else(|| instance_id.to_string());
        let selector = format!("{LABEL_TENANT}={tenant_id}");
        self.list_in(&namespace, Some(&selector)).await
    }

    async fn instance_namespace(&self, instance_id: &str) -> Result<String> {
        let instance = self.get_instance(instance_id).await?;
        Ok(instance
            .metadata
            .name
            .unwrap_or_else(|| instance_id.to_string()))
    }

    async fn fetch<K>(&self, namespace: Option<&str>, name: &str) -> Result<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let object = self
            .client
            .get(&api_resource::<K>(), namespace, name)
            .await?;
        from_dynamic(object)
    }

    async fn create<K>(&self, object: &K) -> Result<()>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let dynamic = to_dynamic(object)?;
        debug!(
            kind = %K::kind(&()),
            name = ?dynamic.metadata.name,
            namespace = ?dynamic.metadata.namespace,
            "Creating resource"
        );
        self.client.create(&api_resource::<K>(), &dynamic).await?;
        Ok(())
    }

    /// Strict create followed by a re-read to pick up server-assigned fields.
    async fn insert<K>(&self, object: &K) -> Result<K>
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
    {
        self.create(object).await?;
        let name = object.meta().name.as_deref().unwrap_or_default();
        self.fetch(object.meta().namespace.as_deref(), name).await
    }

    async fn list_in<K>(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<K>>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        self.client
            .list(&api_resource::<K>(), Some(namespace), label_selector)
            .await?
            .into_iter()
            .map(from_dynamic)
            .collect()
    }
}

fn api_resource<K: Resource<DynamicType = ()>>() -> ApiResource {
    ApiResource::erase::<K>(&())
}

fn to_dynamic<K: Serialize>(object: &K) -> Result<DynamicObject> {
    Ok(serde_json::from_value(serde_json::to_value(object)?)?)
}

fn from_dynamic<K: DeserializeOwned>(object: DynamicObject) -> Result<K> {
    Ok(serde_json::from_value(serde_json::to_value(object)?)?)
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{what} must be provided")));
    }
    Ok(())
}
