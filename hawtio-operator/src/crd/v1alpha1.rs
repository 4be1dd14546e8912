//! Hawtio `v1alpha1` Custom Resource Definition.
//!
//! Still served so existing manifests keep working, but never stored: the API
//! server converts every `v1alpha1` object to `v1` through the conversion webhook.

#![allow(missing_docs)]

use k8s_openapi::api::core::v1::{LocalObjectReference, ResourceRequirements, SecretKeySelector};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Hawtio `v1alpha1` spec.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "hawt.io",
    version = "v1alpha1",
    kind = "Hawtio",
    plural = "hawtios",
    namespaced,
    status = "HawtioStatus",
    deprecated = "hawt.io/v1alpha1 Hawtio is deprecated, use hawt.io/v1",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HawtioSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub deployment_type: Option<HawtioDeploymentType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub replicas: Option<i32>,

    /// Console image version. Removed in `v1`, where the operator picks the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub metadata_propagation: HawtioMetadataPropagation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_host_name: Option<String>,

    #[serde(default)]
    pub route: HawtioRoute,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_routes: Vec<String>,

    #[serde(default)]
    pub auth: HawtioAuth,

    #[serde(default)]
    pub nginx: HawtioNginx,

    #[serde(default)]
    pub rbac: HawtioRbac,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default)]
    pub config: HawtioConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum HawtioDeploymentType {
    Cluster,
    Namespace,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioMetadataPropagation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_secret: Option<LocalObjectReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<SecretKeySelector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_common_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_expiration_date: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_check_schedule: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_expiration_period: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioNginx {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_body_buffer_size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_buffers: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subrequest_output_buffer_size: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioRbac {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<String>,

    #[serde(
        rename = "disableRBACRegistry",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub disable_rbac_registry: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioConfig {
    #[serde(default)]
    pub about: HawtioAbout,

    #[serde(default)]
    pub branding: HawtioBranding,

    #[serde(default)]
    pub online: HawtioOnline,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_routes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioAbout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "productInfo", default, skip_serializing_if = "Vec::is_empty")]
    pub product_infos: Vec<HawtioProductInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_src: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct HawtioProductInfo {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioBranding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    #[serde(rename = "appLogoUrl", default, skip_serializing_if = "Option::is_none")]
    pub app_logo_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioOnline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_selector: Option<String>,

    #[serde(default)]
    pub console_link: HawtioConsoleLink,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioConsoleLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_relative_path: Option<String>,
}

/// Hawtio `v1alpha1` status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HawtioStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<HawtioPhase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(rename = "URL", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// Raw `v1alpha1` phase string.
///
/// This revision never validated phases, so any string is accepted as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct HawtioPhase(pub String);

impl HawtioPhase {
    pub const INITIALIZED: &'static str = "Initialized";
    pub const DEPLOYED: &'static str = "Deployed";
    pub const FAILED: &'static str = "Failed";
}

impl From<&str> for HawtioPhase {
    fn from(raw: &str) -> Self {
        HawtioPhase(raw.to_string())
    }
}
