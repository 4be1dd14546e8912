//! Typed object store used by the controller and the capability detector.
//!
//! The controller never talks to `kube::Api` directly. It reads and writes
//! [`DynamicObject`]s addressed by [`ObjectKey`] through an [`ObjectStore`], so the
//! decision logic runs the same against a live cluster ([`KubeStore`]) and against
//! an in-memory store in tests.

use crate::error::{OperatorError, OperatorResult};
use async_trait::async_trait;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Address of an object in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// API group (empty for the core group).
    pub group: String,
    /// API version.
    pub version: String,
    /// Kind.
    pub kind: String,
    /// Namespace, `None` for cluster scoped objects.
    pub namespace: Option<String>,
    /// Name.
    pub name: String,
}

impl ObjectKey {
    /// Key of a typed resource.
    pub fn of<K>(namespace: Option<&str>, name: &str) -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self {
            group: K::group(&()).into_owned(),
            version: K::version(&()).into_owned(),
            kind: K::kind(&()).into_owned(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Key of a dynamic object, read from its `apiVersion`/`kind`.
    pub fn from_dynamic(obj: &DynamicObject) -> OperatorResult<Self> {
        let types = obj.types.as_ref().ok_or_else(|| {
            OperatorError::InvalidConfig(format!("object {} has no type metadata", obj.name_any()))
        })?;
        let (group, version) = match types.api_version.split_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (String::new(), types.api_version.clone()),
        };
        Ok(Self {
            group,
            version,
            kind: types.kind.clone(),
            namespace: obj.metadata.namespace.clone(),
            name: obj.name_any(),
        })
    }

    /// Group/version/kind of the key.
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(&self.group, &self.version, &self.kind)
    }

    /// `apiVersion` string of the key.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} {}/{}", self.api_version(), self.kind, ns, self.name),
            None => write!(f, "{}/{} {}", self.api_version(), self.kind, self.name),
        }
    }
}

/// Read/write access to cluster objects.
///
/// Writes use optimistic concurrency: `update` and `update_status` must fail with
/// [`OperatorError::Conflict`] when the object's `resourceVersion` is stale. Absence
/// is reported as `Ok(None)` from `get`, never as an error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object, `None` if it does not exist.
    async fn get(&self, key: &ObjectKey) -> OperatorResult<Option<DynamicObject>>;

    /// Create an object.
    async fn create(&self, obj: &DynamicObject) -> OperatorResult<DynamicObject>;

    /// Replace an object. `obj` must carry the `resourceVersion` it was read at.
    async fn update(&self, obj: &DynamicObject) -> OperatorResult<DynamicObject>;

    /// Replace the status subresource only, guarded by `resource_version`.
    async fn update_status(
        &self,
        key: &ObjectKey,
        resource_version: Option<&str>,
        status: serde_json::Value,
    ) -> OperatorResult<()>;

    /// Delete an object. Deleting an absent object succeeds.
    async fn delete(&self, key: &ObjectKey) -> OperatorResult<()>;

    /// Whether the API server serves `group`.
    async fn has_api_group(&self, group: &str) -> OperatorResult<bool>;
}

/// Convert a typed resource to a dynamic object.
pub fn to_dynamic<K: Serialize>(obj: &K) -> OperatorResult<DynamicObject> {
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

/// Convert a dynamic object to a typed resource.
pub fn from_dynamic<K: DeserializeOwned>(obj: DynamicObject) -> OperatorResult<K> {
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

/// Fetch and decode a typed resource.
pub async fn get_typed<K>(
    store: &dyn ObjectStore,
    namespace: Option<&str>,
    name: &str,
) -> OperatorResult<Option<K>>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    match store.get(&ObjectKey::of::<K>(namespace, name)).await? {
        Some(obj) => Ok(Some(from_dynamic(obj)?)),
        None => Ok(None),
    }
}

/// [`ObjectStore`] backed by a Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl KubeStore {
    /// Create a store writing as `field_manager`.
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn api(&self, key: &ObjectKey) -> Api<DynamicObject> {
        let resource = ApiResource::from_gvk(&key.gvk());
        match &key.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, key: &ObjectKey) -> OperatorResult<Option<DynamicObject>> {
        Ok(self.api(key).get_opt(&key.name).await?)
    }

    async fn create(&self, obj: &DynamicObject) -> OperatorResult<DynamicObject> {
        let key = ObjectKey::from_dynamic(obj)?;
        Ok(self.api(&key).create(&self.post_params(), obj).await?)
    }

    async fn update(&self, obj: &DynamicObject) -> OperatorResult<DynamicObject> {
        let key = ObjectKey::from_dynamic(obj)?;
        match self
            .api(&key)
            .replace(&key.name, &self.post_params(), obj)
            .await
        {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(err)) if err.code == 409 => Err(OperatorError::Conflict {
                kind: key.kind,
                name: key.name,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_status(
        &self,
        key: &ObjectKey,
        resource_version: Option<&str>,
        status: serde_json::Value,
    ) -> OperatorResult<()> {
        // A resourceVersion in a merge patch acts as a precondition.
        let mut patch = serde_json::json!({
            "apiVersion": key.api_version(),
            "kind": key.kind,
            "status": status,
        });
        if let Some(rv) = resource_version {
            patch["metadata"] = serde_json::json!({ "resourceVersion": rv });
        }
        let params = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        };

        match self
            .api(key)
            .patch_status(&key.name, &params, &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 409 => Err(OperatorError::Conflict {
                kind: key.kind.clone(),
                name: key.name.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &ObjectKey) -> OperatorResult<()> {
        match self.api(key).delete(&key.name, &DeleteParams::background()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn has_api_group(&self, group: &str) -> OperatorResult<bool> {
        let groups = self.client.list_api_groups().await?;
        Ok(groups.groups.iter().any(|g| g.name == group))
    }
}
