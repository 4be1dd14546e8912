//! Cluster capability detection.
//!
//! Decides whether the operator runs on OpenShift and which routing primitive it
//! can use. The result is a plain [`CapabilitySnapshot`] value handed to the
//! controller, so the decision logic never consults global state.

use crate::crd::openshift::{CLUSTER_VERSION_NAME, ClusterVersion};
use crate::error::OperatorResult;
use crate::store::{ObjectStore, get_typed};
use k8s_openapi::api::core::v1::ConfigMap;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// API group of OpenShift routes.
pub const ROUTE_API_GROUP: &str = "route.openshift.io";

/// Namespace of the public OpenShift console configuration.
pub const CONSOLE_CONFIG_NAMESPACE: &str = "openshift-config-managed";

/// Name of the public OpenShift console configuration.
pub const CONSOLE_CONFIG_NAME: &str = "console-public";

/// Key of the console URL in [`CONSOLE_CONFIG_NAME`].
pub const CONSOLE_URL_KEY: &str = "consoleURL";

/// Platform facts that decide the shape of the managed resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySnapshot {
    /// A ClusterVersion exists and has at least one completed update.
    pub is_extended_platform: bool,
    /// `route.openshift.io` is served.
    pub routes_available: bool,
    /// OpenShift web console URL, when published.
    pub console_url: Option<String>,
    /// Version of the newest completed platform update.
    pub platform_version: Option<String>,
}

/// Probe the cluster.
///
/// A missing ClusterVersion means plain Kubernetes. A ClusterVersion without a
/// completed update is a cluster still bootstrapping and is not reported as
/// OpenShift. The route API is probed regardless, since a cluster can serve it
/// without being OpenShift. A missing console configuration only leaves
/// `console_url` empty.
///
/// Any other error aborts detection: acting on partial knowledge could pick the
/// wrong routing resource.
pub async fn detect(store: &dyn ObjectStore) -> OperatorResult<CapabilitySnapshot> {
    let routes_available = store.has_api_group(ROUTE_API_GROUP).await?;

    let Some(cluster_version) =
        get_typed::<ClusterVersion>(store, None, CLUSTER_VERSION_NAME).await?
    else {
        tracing::debug!(routes_available, "No ClusterVersion found, assuming Kubernetes");
        return Ok(CapabilitySnapshot {
            routes_available,
            ..Default::default()
        });
    };

    let Some(completed) = cluster_version.completed_version() else {
        tracing::info!("ClusterVersion has no completed update yet, not treating cluster as OpenShift");
        return Ok(CapabilitySnapshot {
            routes_available,
            ..Default::default()
        });
    };
    let platform_version = completed.version.clone();

    let console_url = get_typed::<ConfigMap>(
        store,
        Some(CONSOLE_CONFIG_NAMESPACE),
        CONSOLE_CONFIG_NAME,
    )
    .await?
    .and_then(|cm| cm.data)
    .and_then(|mut data| data.remove(CONSOLE_URL_KEY))
    .filter(|url| !url.is_empty());

    tracing::debug!(
        version = ?platform_version,
        routes_available,
        console_url = ?console_url,
        "Detected OpenShift cluster"
    );

    Ok(CapabilitySnapshot {
        is_extended_platform: true,
        routes_available,
        console_url,
        platform_version,
    })
}

/// Caches the last [`CapabilitySnapshot`] for a bounded time.
///
/// Capabilities change during platform upgrades, so a snapshot is never trusted
/// beyond `ttl`. A zero `ttl` re-probes on every call.
pub struct CapabilityCache {
    ttl: Duration,
    entry: Mutex<Option<(Instant, CapabilitySnapshot)>>,
}

impl CapabilityCache {
    /// Create an empty cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Return the cached snapshot if still fresh, otherwise probe and cache.
    ///
    /// Failed probes are not cached.
    pub async fn get_or_detect(&self, store: &dyn ObjectStore) -> OperatorResult<CapabilitySnapshot> {
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }

        let snapshot = detect(store).await?;
        *self.entry.lock() = Some((Instant::now(), snapshot.clone()));
        Ok(snapshot)
    }

    /// Drop the cached snapshot.
    pub fn invalidate(&self) {
        *self.entry.lock() = None;
    }

    fn fresh(&self) -> Option<CapabilitySnapshot> {
        let entry = self.entry.lock();
        match entry.as_ref() {
            Some((at, snapshot)) if at.elapsed() < self.ttl => Some(snapshot.clone()),
            _ => None,
        }
    }
}
