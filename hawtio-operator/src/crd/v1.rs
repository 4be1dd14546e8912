//! Hawtio `v1` Custom Resource Definition.
//!
//! This is the hub revision: every other served revision converts into it, and it is
//! the only revision the controller reconciles.

use k8s_openapi::api::core::v1::{LocalObjectReference, ResourceRequirements, SecretKeySelector};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hawtio is the Schema for the hawtios API.
///
/// A Hawtio represents a deployed Hawtio web console. The operator creates the
/// Deployment, Service, ConfigMap and either a Route or an Ingress, depending on
/// what the cluster supports.
///
/// # Example
///
/// ```yaml
/// apiVersion: hawt.io/v1
/// kind: Hawtio
/// metadata:
///   name: hawtio-online
/// spec:
///   type: Namespace
///   replicas: 1
///   routeHostName: hawtio.apps.example.com
/// ```
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "hawt.io",
    version = "v1",
    kind = "Hawtio",
    plural = "hawtios",
    namespaced,
    status = "HawtioStatus",
    scale = r#"{"specReplicasPath":".spec.replicas", "statusReplicasPath":".status.replicas", "labelSelectorPath":".status.selector"}"#,
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"URL", "type":"string", "jsonPath":".status.URL"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HawtioSpec {
    /// Deployment type. A missing type behaves as `Namespace`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub deployment_type: Option<HawtioDeploymentType>,

    /// Number of console pods. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub replicas: Option<i32>,

    /// Labels and annotations copied from this resource onto its children.
    #[serde(default)]
    pub metadata_propagation: HawtioMetadataPropagation,

    /// Host name of the Route. Only honoured when routes are available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_host_name: Option<String>,

    /// TLS material for the Route.
    #[serde(default)]
    pub route: HawtioRoute,

    /// Additional externally managed routes serving the console.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_routes: Vec<String>,

    /// Client certificate policy.
    #[serde(default)]
    pub auth: HawtioAuth,

    /// Nginx proxy buffer tuning.
    #[serde(default)]
    pub nginx: HawtioNginx,

    /// RBAC configuration.
    #[serde(default)]
    pub rbac: HawtioRbac,

    /// Compute resources of the console container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Console UI configuration, rendered into `hawtconfig.json`.
    #[serde(default)]
    pub config: HawtioConfig,
}

/// Deployment scope of the console.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum HawtioDeploymentType {
    /// Discover and connect to pods across namespaces.
    Cluster,
    /// Only the namespace the Hawtio resource lives in.
    #[default]
    Namespace,
}

impl fmt::Display for HawtioDeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HawtioDeploymentType::Cluster => f.write_str("Cluster"),
            HawtioDeploymentType::Namespace => f.write_str("Namespace"),
        }
    }
}

/// Label and annotation keys to propagate. `*` matches any run of characters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioMetadataPropagation {
    /// Annotation key patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,

    /// Label key patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Route TLS references.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioRoute {
    /// Secret holding `tls.crt` and `tls.key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_secret: Option<LocalObjectReference>,

    /// Key of a Secret holding the CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<SecretKeySelector>,
}

/// Client certificate policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioAuth {
    /// Common name of the generated client certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_common_name: Option<String>,

    /// Expiration date of the client certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_expiration_date: Option<Time>,

    /// Cron schedule of the certificate expiry check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_check_schedule: Option<String>,

    /// Certificate validity in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_expiration_period: Option<i32>,
}

/// Nginx proxy buffer tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioNginx {
    /// `client_body_buffer_size` directive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_body_buffer_size: Option<String>,

    /// `proxy_buffers` directive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_buffers: Option<String>,

    /// `subrequest_output_buffer_size` directive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subrequest_output_buffer_size: Option<String>,
}

/// RBAC configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioRbac {
    /// ConfigMap holding the `ACL.yaml` RBAC definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<String>,

    /// Disable the RBAC registry optimisation.
    #[serde(
        rename = "disableRBACRegistry",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub disable_rbac_registry: Option<bool>,
}

/// Console UI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioConfig {
    /// About page.
    #[serde(default)]
    pub about: HawtioAbout,

    /// Branding.
    #[serde(default)]
    pub branding: HawtioBranding,

    /// Online specific settings.
    #[serde(default)]
    pub online: HawtioOnline,

    /// Console routes to hide.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_routes: Vec<String>,
}

/// About page content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioAbout {
    /// Title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Product entries, in display order.
    #[serde(rename = "productInfo", default, skip_serializing_if = "Vec::is_empty")]
    pub product_infos: Vec<HawtioProductInfo>,

    /// Free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,

    /// Copyright notice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,

    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_src: Option<String>,
}

/// A product name/value pair on the about page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct HawtioProductInfo {
    /// Product name.
    pub name: String,
    /// Product version or description.
    pub value: String,
}

/// Branding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioBranding {
    /// Application name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    /// Logo URL.
    #[serde(rename = "appLogoUrl", default, skip_serializing_if = "Option::is_none")]
    pub app_logo_url: Option<String>,

    /// Stylesheet URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,

    /// Favicon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

/// Online specific settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioOnline {
    /// Label selector restricting which projects a `Cluster` console discovers.
    ///
    /// Only honoured on OpenShift. On plain Kubernetes there is no project
    /// primitive, so the value is accepted and ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_selector: Option<String>,

    /// OpenShift web console link.
    #[serde(default)]
    pub console_link: HawtioConsoleLink,
}

/// OpenShift web console link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioConsoleLink {
    /// Link text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Application menu section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    /// Icon path relative to the console URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_relative_path: Option<String>,
}

/// Hawtio status. Written only by the controller, always as a whole.
///
/// Fields are serialized even when empty so a merge patch of the status clears
/// anything left over from a previous pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioStatus {
    /// Current phase.
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub phase: Option<HawtioPhase>,

    /// Console image in use.
    #[serde(default)]
    pub image: Option<String>,

    /// Externally reachable console URL.
    #[serde(rename = "URL", default)]
    pub url: Option<String>,

    /// Observed number of console pods.
    #[serde(default)]
    pub replicas: Option<i32>,

    /// Label selector of the console pods, for the scale subresource.
    #[serde(default)]
    pub selector: Option<String>,
}

/// Hawtio phase.
///
/// Phases are read leniently: a string that matches no known phase is kept as
/// [`HawtioPhase::Unrecognized`] instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HawtioPhase {
    /// Resource seen, no children created yet.
    Initialized,
    /// Children applied, console not yet ready.
    Deploying,
    /// Console ready.
    Deployed,
    /// Last reconciliation failed.
    Failed,
    /// A phase string this revision does not know.
    Unrecognized(String),
}

impl HawtioPhase {
    /// The wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            HawtioPhase::Initialized => "Initialized",
            HawtioPhase::Deploying => "Deploying",
            HawtioPhase::Deployed => "Deployed",
            HawtioPhase::Failed => "Failed",
            HawtioPhase::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for HawtioPhase {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Initialized" => HawtioPhase::Initialized,
            "Deploying" => HawtioPhase::Deploying,
            "Deployed" => HawtioPhase::Deployed,
            "Failed" => HawtioPhase::Failed,
            _ => HawtioPhase::Unrecognized(raw),
        }
    }
}

impl From<HawtioPhase> for String {
    fn from(phase: HawtioPhase) -> Self {
        match phase {
            HawtioPhase::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for HawtioPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_round_trips_unknown_values() {
        let phase: HawtioPhase = serde_json::from_str("\"Upgrading\"").unwrap();
        assert_eq!(phase, HawtioPhase::Unrecognized("Upgrading".into()));
        assert_eq!(serde_json::to_string(&phase).unwrap(), "\"Upgrading\"");

        let phase: HawtioPhase = serde_json::from_str("\"Deployed\"").unwrap();
        assert_eq!(phase, HawtioPhase::Deployed);
    }

    #[test]
    fn status_serializes_every_field() {
        let status = HawtioStatus {
            phase: Some(HawtioPhase::Failed),
            ..Default::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "Failed");
        assert!(json.get("URL").unwrap().is_null());
        assert!(json.get("image").unwrap().is_null());
        assert!(json.get("replicas").unwrap().is_null());
        assert!(json.get("selector").unwrap().is_null());
    }

    #[test]
    fn spec_uses_wire_names() {
        let spec: HawtioSpec = serde_json::from_value(serde_json::json!({
            "type": "Cluster",
            "replicas": 2,
            "rbac": { "configMap": "acl", "disableRBACRegistry": true },
            "config": {
                "about": { "productInfo": [{ "name": "Hawtio", "value": "4.0" }] },
                "branding": { "appLogoUrl": "/logo.svg" }
            }
        }))
        .unwrap();

        assert_eq!(spec.deployment_type, Some(HawtioDeploymentType::Cluster));
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(spec.rbac.disable_rbac_registry, Some(true));
        assert_eq!(spec.config.about.product_infos.len(), 1);
        assert_eq!(
            spec.config.branding.app_logo_url.as_deref(),
            Some("/logo.svg")
        );
    }
}
