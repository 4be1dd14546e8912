//! Common test utilities for hawtio-operator tests.

use async_trait::async_trait;
use hawtio_operator::capabilities::{CONSOLE_CONFIG_NAME, CONSOLE_CONFIG_NAMESPACE, ROUTE_API_GROUP};
use hawtio_operator::config::OperatorConfig;
use hawtio_operator::controller::ControllerContext;
use hawtio_operator::crd::openshift::{CLUSTER_VERSION_NAME, ClusterVersion};
use hawtio_operator::crd::{Hawtio, HawtioSpec};
use hawtio_operator::error::{OperatorError, OperatorResult};
use hawtio_operator::store::{ObjectKey, ObjectStore, from_dynamic, to_dynamic};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::core::DynamicObject;
use kube::{Resource, ResourceExt};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Namespace every test Hawtio lives in.
pub const NAMESPACE: &str = "hawtio";

/// Name of the test Hawtio.
pub const NAME: &str = "console";

/// In-memory [`ObjectStore`] with API server like semantics: resourceVersion
/// preconditions, generation bumps on spec changes and a separate status path.
#[derive(Default)]
#[allow(dead_code)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<ObjectKey, DynamicObject>>,
    api_groups: Mutex<BTreeSet<String>>,
    /// Failure returned by every call while set.
    fault: Mutex<Option<u16>>,
    latency: Mutex<Option<Duration>>,
    next_version: AtomicU64,
    writes: AtomicUsize,
    status_writes: AtomicUsize,
}

#[allow(dead_code)]
impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of create, update and delete calls that changed something.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of status writes.
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    /// Total writes of any kind.
    pub fn total_writes(&self) -> usize {
        self.writes() + self.status_writes()
    }

    /// Serve or stop serving an API group.
    pub fn set_api_group(&self, group: &str, served: bool) {
        let mut groups = self.api_groups.lock();
        if served {
            groups.insert(group.to_string());
        } else {
            groups.remove(group);
        }
    }

    /// Make every call fail with `code` until cleared.
    pub fn set_fault(&self, code: Option<u16>) {
        *self.fault.lock() = code;
    }

    /// Delay every call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Insert or overwrite an object without going through the write path.
    pub fn seed<K: Serialize>(&self, obj: &K) {
        let mut obj = to_dynamic(obj).expect("seed object serializes");
        let key = ObjectKey::from_dynamic(&obj).expect("seed object has type metadata");
        obj.metadata.resource_version = Some(self.bump());
        obj.metadata.uid.get_or_insert_with(|| format!("uid-{}", key.name));
        obj.metadata.generation.get_or_insert(1);
        self.objects.lock().insert(key, obj);
    }

    /// Read a typed object.
    pub fn typed<K>(&self, namespace: Option<&str>, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let obj = self
            .objects
            .lock()
            .get(&ObjectKey::of::<K>(namespace, name))
            .cloned()?;
        Some(from_dynamic(obj).expect("stored object decodes"))
    }

    /// Whether an object exists.
    pub fn contains<K: Resource<DynamicType = ()>>(&self, namespace: Option<&str>, name: &str) -> bool {
        self.objects
            .lock()
            .contains_key(&ObjectKey::of::<K>(namespace, name))
    }

    /// Number of stored objects of kind `K`.
    pub fn count<K: Resource<DynamicType = ()>>(&self) -> usize {
        let kind = K::kind(&());
        self.objects
            .lock()
            .keys()
            .filter(|k| k.kind == kind)
            .count()
    }

    /// Edit a stored object in place, as another client would.
    pub fn modify<K, F>(&self, namespace: Option<&str>, name: &str, f: F)
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
        F: FnOnce(&mut K),
    {
        let key = ObjectKey::of::<K>(namespace, name);
        let mut objects = self.objects.lock();
        let current = objects.get(&key).cloned().expect("object to modify exists");
        let mut typed: K = from_dynamic(current).expect("stored object decodes");
        f(&mut typed);
        let mut obj = to_dynamic(&typed).expect("modified object serializes");
        obj.metadata.resource_version = Some(self.bump());
        objects.insert(key, obj);
    }

    /// Play the Deployment controller: mark the console Deployment rolled out.
    pub fn roll_out(&self, namespace: &str, name: &str) {
        self.modify::<Deployment, _>(Some(namespace), name, |d| {
            let replicas = d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
            d.status = Some(k8s_openapi::api::apps::v1::DeploymentStatus {
                observed_generation: d.metadata.generation,
                replicas: Some(replicas),
                ready_replicas: Some(replicas),
                updated_replicas: Some(replicas),
                available_replicas: Some(replicas),
                ..Default::default()
            });
        });
    }

    fn bump(&self) -> String {
        (self.next_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    async fn enter(&self) -> OperatorResult<()> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match *self.fault.lock() {
            Some(code) => Err(OperatorError::ApiError {
                code,
                message: "injected fault".into(),
            }),
            None => Ok(()),
        }
    }
}

fn conflict(key: &ObjectKey) -> OperatorError {
    OperatorError::Conflict {
        kind: key.kind.clone(),
        name: key.name.clone(),
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &ObjectKey) -> OperatorResult<Option<DynamicObject>> {
        self.enter().await?;
        Ok(self.objects.lock().get(key).cloned())
    }

    async fn create(&self, obj: &DynamicObject) -> OperatorResult<DynamicObject> {
        self.enter().await?;
        let key = ObjectKey::from_dynamic(obj)?;
        let mut objects = self.objects.lock();
        if objects.contains_key(&key) {
            return Err(OperatorError::ApiError {
                code: 409,
                message: format!("{key} already exists"),
            });
        }

        let mut created = obj.clone();
        created.metadata.resource_version = Some(self.bump());
        created.metadata.uid = Some(format!("uid-{}-{}", key.kind.to_lowercase(), key.name));
        created.metadata.generation = Some(1);
        objects.insert(key, created.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn update(&self, obj: &DynamicObject) -> OperatorResult<DynamicObject> {
        self.enter().await?;
        let key = ObjectKey::from_dynamic(obj)?;
        let mut objects = self.objects.lock();
        let live = objects.get(&key).ok_or_else(|| OperatorError::ApiError {
            code: 404,
            message: format!("{key} not found"),
        })?;
        if obj.metadata.resource_version != live.metadata.resource_version {
            return Err(conflict(&key));
        }

        let mut updated = obj.clone();
        updated.metadata.uid = live.metadata.uid.clone();
        updated.metadata.resource_version = Some(self.bump());
        let generation = live.metadata.generation.unwrap_or(1);
        updated.metadata.generation = Some(if live.data.get("spec") != obj.data.get("spec") {
            generation + 1
        } else {
            generation
        });
        // The main resource path never changes status.
        match live.data.get("status").cloned() {
            Some(status) => {
                updated.data["status"] = status;
            }
            None => {
                if let Some(map) = updated.data.as_object_mut() {
                    map.remove("status");
                }
            }
        }
        objects.insert(key, updated.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(updated)
    }

    async fn update_status(
        &self,
        key: &ObjectKey,
        resource_version: Option<&str>,
        status: serde_json::Value,
    ) -> OperatorResult<()> {
        self.enter().await?;
        let mut objects = self.objects.lock();
        let live = objects.get_mut(key).ok_or_else(|| OperatorError::ApiError {
            code: 404,
            message: format!("{key} not found"),
        })?;
        if let Some(rv) = resource_version {
            if live.metadata.resource_version.as_deref() != Some(rv) {
                return Err(conflict(key));
            }
        }

        live.data["status"] = status;
        live.metadata.resource_version = Some(self.bump());
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &ObjectKey) -> OperatorResult<()> {
        self.enter().await?;
        if self.objects.lock().remove(key).is_some() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn has_api_group(&self, group: &str) -> OperatorResult<bool> {
        self.enter().await?;
        Ok(self.api_groups.lock().contains(group))
    }
}

/// A namespaced test Hawtio.
#[allow(dead_code)]
pub fn hawtio(spec: HawtioSpec) -> Hawtio {
    let mut hawtio = Hawtio::new(NAME, spec);
    hawtio.metadata.namespace = Some(NAMESPACE.to_string());
    hawtio
}

/// Make the store look like an OpenShift cluster.
#[allow(dead_code)]
pub fn make_openshift(store: &MemoryStore, console_url: Option<&str>) {
    let mut cv = ClusterVersion::new(CLUSTER_VERSION_NAME, Default::default());
    cv.status = Some(hawtio_operator::crd::openshift::ClusterVersionStatus {
        history: vec![hawtio_operator::crd::openshift::UpdateHistory {
            state: "Completed".into(),
            version: Some("4.19.0".into()),
        }],
    });
    store.seed(&cv);
    store.set_api_group(ROUTE_API_GROUP, true);

    if let Some(url) = console_url {
        let cm = ConfigMap {
            metadata: kube::api::ObjectMeta {
                name: Some(CONSOLE_CONFIG_NAME.into()),
                namespace: Some(CONSOLE_CONFIG_NAMESPACE.into()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("consoleURL".to_string(), url.to_string())])),
            ..Default::default()
        };
        store.seed(&cm);
    }
}

/// Controller context over `store` with capabilities re-probed on every pass.
#[allow(dead_code)]
pub fn context(store: Arc<MemoryStore>) -> Arc<ControllerContext> {
    let config = OperatorConfig {
        capability_ttl: Duration::ZERO,
        ..Default::default()
    };
    Arc::new(ControllerContext::new(store, config))
}

/// Current stored Hawtio.
#[allow(dead_code)]
pub fn current(store: &MemoryStore) -> Arc<Hawtio> {
    Arc::new(
        store
            .typed::<Hawtio>(Some(NAMESPACE), NAME)
            .expect("test Hawtio exists"),
    )
}

/// Owner uid the store assigned to the test Hawtio.
#[allow(dead_code)]
pub fn hawtio_uid(store: &MemoryStore) -> String {
    current(store).uid().expect("seeded Hawtio has a uid")
}
