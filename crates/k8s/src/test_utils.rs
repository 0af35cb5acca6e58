//! In-memory [`ControlPlane`] for tests.
//!
//! Objects are keyed by group, kind, namespace and name. Creates assign a
//! uid and resource version the way an API server would, every call is
//! recorded, and apply failures can be injected per kind.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::core::ApiResource;
use kube::Resource;
use serde::Serialize;

use crate::client::{parse_manifest, AppliedObject, ControlPlane};
use crate::error::{Error, Result};

/// A recorded control-plane call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get {
        kind: String,
        namespace: Option<String>,
        name: String,
    },
    Create {
        kind: String,
        namespace: Option<String>,
        name: String,
    },
    List {
        kind: String,
        namespace: Option<String>,
        selector: Option<String>,
    },
    Apply {
        kind: String,
        name: String,
    },
}

type ObjectKey = (String, String, Option<String>, String);

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, DynamicObject>,
    calls: Vec<Call>,
    failing_apply_kinds: BTreeSet<String>,
    next_uid: u64,
}

#[derive(Default)]
pub struct MemoryControlPlane {
    state: Mutex<State>,
}

impl MemoryControlPlane {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every `apply` of a document with this kind fail with `Transport`.
    pub fn fail_apply_of(&self, kind: &str) {
        self.lock().failing_apply_kinds.insert(kind.to_string());
    }

    /// Store (or overwrite) a typed object without going through `create`.
    pub fn put<K>(&self, object: &K)
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let resource = ApiResource::erase::<K>(&());
        let value = serde_json::to_value(object).unwrap_or_default();
        if let Ok(dynamic) = serde_json::from_value::<DynamicObject>(value) {
            let key = key_for(&resource.group, &resource.kind, &dynamic);
            self.lock().objects.insert(key, dynamic);
        }
    }

    /// True when an object of `kind` exists under the given identity.
    #[must_use]
    pub fn contains(&self, kind: &str, namespace: Option<&str>, name: &str) -> bool {
        self.lock().objects.keys().any(|(_, k, ns, n)| {
            k == kind && ns.as_deref() == namespace && n == name
        })
    }

    /// Every stored object of `kind`, in key order.
    #[must_use]
    pub fn objects_of(&self, kind: &str) -> Vec<DynamicObject> {
        self.lock()
            .objects
            .iter()
            .filter(|((_, k, _, _), _)| k == kind)
            .map(|(_, object)| object.clone())
            .collect()
    }

    /// All recorded calls, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Names of applied objects, in apply order.
    #[must_use]
    pub fn applied(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Apply { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

fn key_for(group: &str, kind: &str, object: &DynamicObject) -> ObjectKey {
    (
        group.to_string(),
        kind.to_string(),
        object.metadata.namespace.clone(),
        object.metadata.name.clone().unwrap_or_default(),
    )
}

fn matches_selector(object: &DynamicObject, selector: Option<&str>) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    let labels = object.metadata.labels.clone().unwrap_or_default();
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels.get(key).is_some_and(|v| v == value),
            None => labels.contains_key(term),
        })
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject> {
        let mut state = self.lock();
        state.calls.push(Call::Get {
            kind: resource.kind.clone(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        });
        let key = (
            resource.group.clone(),
            resource.kind.clone(),
            namespace.map(str::to_string),
            name.to_string(),
        );
        state
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(&resource.kind, namespace, name))
    }

    async fn create(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let mut state = self.lock();
        let key = key_for(&resource.group, &resource.kind, object);
        state.calls.push(Call::Create {
            kind: resource.kind.clone(),
            namespace: key.2.clone(),
            name: key.3.clone(),
        });
        if state.objects.contains_key(&key) {
            return Err(Error::already_exists(&resource.kind, key.2.as_deref(), &key.3));
        }

        state.next_uid += 1;
        let mut stored = object.clone();
        stored.metadata.uid = Some(format!("uid-{}", state.next_uid));
        stored.metadata.resource_version = Some("1".to_string());
        stored.metadata.generation = Some(1);
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let mut state = self.lock();
        state.calls.push(Call::List {
            kind: resource.kind.clone(),
            namespace: namespace.map(str::to_string),
            selector: label_selector.map(str::to_string),
        });
        Ok(state
            .objects
            .iter()
            .filter(|((group, kind, ns, _), _)| {
                *group == resource.group
                    && *kind == resource.kind
                    && (namespace.is_none() || ns.as_deref() == namespace)
            })
            .map(|(_, object)| object)
            .filter(|object| matches_selector(object, label_selector))
            .cloned()
            .collect())
    }

    async fn apply(&self, manifest: &str) -> Result<Vec<AppliedObject>> {
        let objects = parse_manifest(manifest)?;
        let mut applied = Vec::with_capacity(objects.len());
        let mut state = self.lock();
        for object in objects {
            let id = object.id;
            state.calls.push(Call::Apply {
                kind: id.kind.clone(),
                name: id.name.clone(),
            });
            if state.failing_apply_kinds.contains(&id.kind) {
                return Err(Error::transport(format!(
                    "injected apply failure for {} '{}'",
                    id.kind, id.name
                )));
            }
            let dynamic: DynamicObject = serde_json::from_value(object.body)?;
            let group = id.gvk().group;
            state.objects.insert(key_for(&group, &id.kind, &dynamic), dynamic);
            applied.push(id);
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matching() {
        let object: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "a", "labels": {"x": "1", "y": "2"}}
        }))
        .unwrap();
        assert!(matches_selector(&object, None));
        assert!(matches_selector(&object, Some("x=1")));
        assert!(matches_selector(&object, Some("x=1,y=2")));
        assert!(!matches_selector(&object, Some("x=2")));
        assert!(matches_selector(&object, Some("y")));
        assert!(!matches_selector(&object, Some("z")));
    }

    #[tokio::test]
    async fn test_apply_records_and_fails_on_injected_kind() {
        let fake = MemoryControlPlane::new();
        fake.fail_apply_of("Deployment");
        let manifest = "apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: sa\n---\napiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: manager\n";
        let err = fake.apply(manifest).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(fake.applied(), vec!["sa", "manager"]);
        assert!(fake.contains("ServiceAccount", None, "sa"));
        assert!(!fake.contains("Deployment", None, "manager"));
    }
}
