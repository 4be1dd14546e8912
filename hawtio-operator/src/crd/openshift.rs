//! OpenShift API types the operator reads or manages.
//!
//! These are owned by OpenShift, so only the fields the operator touches are
//! modelled and no schema is generated for them.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Name of the singleton `ClusterVersion` object.
pub const CLUSTER_VERSION_NAME: &str = "version";

/// `ClusterVersion` history state of a finished update.
pub const COMPLETED_UPDATE: &str = "Completed";

/// OpenShift Route (`route.openshift.io/v1`).
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[kube(
    group = "route.openshift.io",
    version = "v1",
    kind = "Route",
    plural = "routes",
    namespaced,
    status = "RouteStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Requested host. The router assigns one when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Backend the route points at.
    pub to: RouteTargetReference,

    /// Target port on the backend service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<RoutePort>,

    /// TLS termination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

/// Route backend reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    /// Always `Service`.
    pub kind: String,
    /// Service name.
    pub name: String,
}

/// Route target port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    /// Port name or number on the service.
    pub target_port: IntOrString,
}

/// Route TLS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// `edge`, `passthrough` or `reencrypt`.
    pub termination: String,

    /// What to do with plain HTTP traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_edge_termination_policy: Option<String>,

    /// PEM certificate presented to clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    /// PEM key of `certificate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// PEM CA chain of `certificate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<String>,

    /// PEM CA used to verify the backend for `reencrypt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_ca_certificate: Option<String>,
}

/// Route status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    /// Routers that admitted the route.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<RouteIngress>,
}

/// A router's view of the route.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteIngress {
    /// Host the router serves the route on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Router name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_name: Option<String>,
}

/// OpenShift ClusterVersion (`config.openshift.io/v1`), a cluster scoped singleton.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "ClusterVersion",
    plural = "clusterversions",
    status = "ClusterVersionStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersionSpec {
    /// Cluster identifier.
    #[serde(rename = "clusterID", default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,

    /// Update channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

/// ClusterVersion status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersionStatus {
    /// Update history, newest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<UpdateHistory>,
}

/// One entry of the ClusterVersion update history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHistory {
    /// `Completed` or `Partial`.
    pub state: String,

    /// Version the update targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ClusterVersion {
    /// Version of the newest completed update, if any.
    ///
    /// A ClusterVersion with no completed update belongs to a cluster still
    /// bootstrapping and must not be treated as OpenShift yet.
    pub fn completed_version(&self) -> Option<&UpdateHistory> {
        self.status
            .as_ref()?
            .history
            .iter()
            .find(|entry| entry.state == COMPLETED_UPDATE)
    }
}

/// `ConsoleLink` location of links shown in the application menu.
pub const APPLICATION_MENU: &str = "ApplicationMenu";

/// `ConsoleLink` location of links shown on a namespace dashboard.
pub const NAMESPACE_DASHBOARD: &str = "NamespaceDashboard";

/// OpenShift web console link (`console.openshift.io/v1`), cluster scoped.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[kube(
    group = "console.openshift.io",
    version = "v1",
    kind = "ConsoleLink",
    plural = "consolelinks",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLinkSpec {
    /// Absolute URL the link opens.
    pub href: String,

    /// Link text.
    pub text: String,

    /// Where the console shows the link.
    pub location: String,

    /// Placement in the application menu.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_menu: Option<ApplicationMenuSpec>,

    /// Namespaces whose dashboard shows the link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_dashboard: Option<NamespaceDashboardSpec>,
}

/// Application menu placement of a link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationMenuSpec {
    /// Menu section heading.
    pub section: String,

    /// Icon shown next to the link.
    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Namespace dashboards showing a link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceDashboardSpec {
    /// Namespaces, empty for none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
}
