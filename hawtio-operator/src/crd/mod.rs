//! Custom Resource Definitions for the Hawtio Kubernetes operator.
//!
//! - [`v1::Hawtio`]: the hub revision, stored and reconciled
//! - [`v1alpha1::Hawtio`]: the deprecated revision, served and converted to `v1`
//! - [`openshift`]: OpenShift types the operator reads or manages

pub mod openshift;
pub mod v1;
pub mod v1alpha1;

pub use v1::{
    Hawtio, HawtioAbout, HawtioAuth, HawtioBranding, HawtioConfig, HawtioConsoleLink,
    HawtioDeploymentType, HawtioMetadataPropagation, HawtioNginx, HawtioOnline, HawtioPhase,
    HawtioProductInfo, HawtioRbac, HawtioRoute, HawtioSpec, HawtioStatus,
};

use crate::error::{OperatorError, OperatorResult};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceConversion, CustomResourceDefinition, ServiceReference, WebhookClientConfig,
    WebhookConversion,
};
use kube::CustomResourceExt;
use kube::core::crd::merge_crds;

/// API group of the Hawtio resource.
pub const GROUP: &str = "hawt.io";

/// apiVersion of the hub revision.
pub const HUB_API_VERSION: &str = "hawt.io/v1";

/// apiVersion of the deprecated revision.
pub const V1ALPHA1_API_VERSION: &str = "hawt.io/v1alpha1";

/// Path the conversion webhook serves on.
pub const CONVERSION_PATH: &str = "/convert";

/// Service fronting the conversion webhook.
#[derive(Debug, Clone)]
pub struct ConversionWebhookService {
    /// Service name.
    pub name: String,
    /// Service namespace.
    pub namespace: String,
    /// Service port.
    pub port: i32,
}

/// Build the multi-version Hawtio CRD.
///
/// `v1` is the storage version. When `webhook` is given, the CRD delegates
/// conversion to it; otherwise the API server's `None` strategy applies, which is
/// only safe while no `v1alpha1` objects exist.
pub fn generate_crd(
    webhook: Option<&ConversionWebhookService>,
) -> OperatorResult<CustomResourceDefinition> {
    let mut crd = merge_crds(vec![v1alpha1::Hawtio::crd(), v1::Hawtio::crd()], "v1")
        .map_err(|e| OperatorError::InvalidConfig(format!("cannot merge Hawtio CRDs: {e}")))?;

    if let Some(svc) = webhook {
        crd.spec.conversion = Some(CustomResourceConversion {
            strategy: "Webhook".to_string(),
            webhook: Some(WebhookConversion {
                client_config: Some(WebhookClientConfig {
                    service: Some(ServiceReference {
                        name: svc.name.clone(),
                        namespace: svc.namespace.clone(),
                        path: Some(CONVERSION_PATH.to_string()),
                        port: Some(svc.port),
                    }),
                    ..Default::default()
                }),
                conversion_review_versions: vec!["v1".to_string()],
            }),
        });
    }

    Ok(crd)
}
