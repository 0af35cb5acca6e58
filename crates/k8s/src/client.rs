//! Control-plane access.
//!
//! [`ControlPlane`] is the generic get/create/list primitive every DeviceChain
//! component talks to, plus an `apply` used for manifest bundles. Components
//! receive it explicitly as `Arc<dyn ControlPlane>`; nothing holds a global client.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, GroupVersionKind};
use kube::discovery::{self, Scope};
use kube::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Identity of one object written by [`ControlPlane::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedObject {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

impl AppliedObject {
    /// Group/version/kind of the object.
    #[must_use]
    pub fn gvk(&self) -> GroupVersionKind {
        let (group, version) = self
            .api_version
            .split_once('/')
            .unwrap_or(("", self.api_version.as_str()));
        GroupVersionKind::gvk(group, version, &self.kind)
    }
}

/// One document of a manifest bundle, ready to apply.
#[derive(Debug, Clone)]
pub struct ManifestObject {
    pub id: AppliedObject,
    pub body: serde_json::Value,
}

/// Split a (possibly multi-document) YAML manifest into objects.
///
/// Empty documents are skipped. Every remaining document must carry
/// `apiVersion`, `kind` and `metadata.name`.
pub fn parse_manifest(manifest: &str) -> Result<Vec<ManifestObject>> {
    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(manifest) {
        let body = serde_json::Value::deserialize(document)?;
        if body.is_null() {
            continue;
        }
        let field = |pointer: &str| body.pointer(pointer).and_then(|v| v.as_str());
        let api_version = field("/apiVersion")
            .ok_or_else(|| Error::validation("manifest document is missing apiVersion"))?;
        let kind =
            field("/kind").ok_or_else(|| Error::validation("manifest document is missing kind"))?;
        let name = field("/metadata/name")
            .ok_or_else(|| Error::validation(format!("{kind} manifest is missing metadata.name")))?;
        let id = AppliedObject {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: field("/metadata/namespace").map(str::to_string),
        };
        objects.push(ManifestObject { id, body });
    }
    Ok(objects)
}

/// Generic access to the target control plane.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Fetch one object. Fails `NotFound` when absent.
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject>;

    /// Create one object in the namespace named by its metadata.
    /// Fails `AlreadyExists` when the identity is taken.
    async fn create(&self, resource: &ApiResource, object: &DynamicObject)
        -> Result<DynamicObject>;

    /// List objects, optionally filtered by a label selector (`k=v,k2=v2`).
    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>>;

    /// Upsert every document of a YAML manifest, in document order.
    async fn apply(&self, manifest: &str) -> Result<Vec<AppliedObject>>;
}

/// [`ControlPlane`] backed by a Kubernetes API server.
#[derive(Clone)]
pub struct KubeControlPlane {
    client: Client,
    field_manager: String,
}

impl KubeControlPlane {
    #[must_use]
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    /// Connect using the ambient kubeconfig or in-cluster configuration.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if no usable configuration is found.
    pub async fn try_default(field_manager: impl Into<String>) -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, field_manager))
    }

    fn api(&self, resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        }
    }

    async fn apply_object(&self, object: &ManifestObject) -> Result<()> {
        let id = &object.id;
        let (resource, caps) = discovery::pinned_kind(&self.client, &id.gvk())
            .await
            .map_err(|e| Error::transport(format!("cannot resolve {}/{}: {e}", id.api_version, id.kind)))?;

        let api: Api<DynamicObject> = match (&caps.scope, id.namespace.as_deref()) {
            (Scope::Namespaced, Some(ns)) => Api::namespaced_with(self.client.clone(), ns, &resource),
            (Scope::Namespaced, None) => Api::default_namespaced_with(self.client.clone(), &resource),
            (Scope::Cluster, _) => Api::all_with(self.client.clone(), &resource),
        };

        let params = PatchParams::apply(&self.field_manager).force();
        api.patch(&id.name, &params, &Patch::Apply(&object.body))
            .await
            .map_err(|e| Error::from_kube(e, &id.kind, id.namespace.as_deref(), &id.name))?;

        debug!(kind = %id.kind, name = %id.name, namespace = ?id.namespace, "Applied manifest");
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject> {
        self.api(resource, namespace)
            .get(name)
            .await
            .map_err(|e| Error::from_kube(e, &resource.kind, namespace, name))
    }

    async fn create(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let namespace = object.metadata.namespace.as_deref();
        let name = object.metadata.name.as_deref().unwrap_or_default();
        self.api(resource, namespace)
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| Error::from_kube(e, &resource.kind, namespace, name))
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let list = self.api(resource, namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn apply(&self, manifest: &str) -> Result<Vec<AppliedObject>> {
        let objects = parse_manifest(manifest)?;
        for object in &objects {
            self.apply_object(object).await?;
        }
        Ok(objects.into_iter().map(|o| o.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_document_manifest() {
        let manifest = r"
apiVersion: v1
kind: ServiceAccount
metadata:
  name: dc-controller-manager
  namespace: dc-system
---
---
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRole
metadata:
  name: dc-manager-role
";
        let objects = parse_manifest(manifest).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].id.namespace.as_deref(), Some("dc-system"));
        assert_eq!(objects[1].id.kind, "ClusterRole");
        assert_eq!(objects[1].id.gvk().group, "rbac.authorization.k8s.io");
        assert_eq!(objects[0].id.gvk().group, "");
        assert_eq!(objects[0].id.gvk().version, "v1");
    }

    #[test]
    fn test_parse_rejects_document_without_name() {
        let manifest = "apiVersion: v1\nkind: ConfigMap\nmetadata: {}\n";
        let err = parse_manifest(manifest).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_parse_rejects_malformed_yaml() {
        let err = parse_manifest("kind: [unterminated").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
