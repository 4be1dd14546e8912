//! Conversion between Hawtio API revisions.
//!
//! Conversion is one-way: `v1alpha1` upgrades to the `v1` hub, dropping the
//! deprecated `version` field. Nothing converts back, because the dropped data
//! cannot be recovered.
//!
//! Every nested block is rebuilt from owned copies, so the converted object never
//! shares storage with its source.

use crate::crd::{HUB_API_VERSION, V1ALPHA1_API_VERSION, v1, v1alpha1};
use crate::error::{OperatorError, OperatorResult};
use kube::ResourceExt;
use serde_json::Value;

/// Upgrade a `v1alpha1` Hawtio to the `v1` hub revision.
pub fn upgrade_to_hub(src: &v1alpha1::Hawtio) -> OperatorResult<v1::Hawtio> {
    if src.spec.version.is_some() {
        tracing::debug!(
            name = %src.name_any(),
            "Dropping deprecated spec.version during conversion to v1"
        );
    }

    let mut dst = v1::Hawtio::new(&src.name_any(), upgrade_spec(&src.spec));
    dst.metadata = src.metadata.clone();
    dst.status = src.status.as_ref().map(upgrade_status);
    Ok(dst)
}

/// Convert a `v1` Hawtio back to `v1alpha1`.
///
/// Always fails: `v1alpha1` is a legacy revision and is never produced.
pub fn downgrade_from_hub(_hub: &v1::Hawtio) -> OperatorResult<v1alpha1::Hawtio> {
    Err(OperatorError::UnsupportedConversion {
        from: HUB_API_VERSION.to_string(),
        to: V1ALPHA1_API_VERSION.to_string(),
    })
}

/// Convert a raw object, as received in a ConversionReview, to `desired_api_version`.
pub fn convert_object(object: Value, desired_api_version: &str) -> OperatorResult<Value> {
    let api_version = object
        .get("apiVersion")
        .and_then(Value::as_str)
        .ok_or_else(|| OperatorError::InvalidConfig("object has no apiVersion".into()))?
        .to_string();

    if api_version == desired_api_version {
        return Ok(object);
    }

    match (api_version.as_str(), desired_api_version) {
        (V1ALPHA1_API_VERSION, HUB_API_VERSION) => {
            let src: v1alpha1::Hawtio = serde_json::from_value(object)?;
            Ok(serde_json::to_value(upgrade_to_hub(&src)?)?)
        }
        (HUB_API_VERSION, V1ALPHA1_API_VERSION) => {
            let hub: v1::Hawtio = serde_json::from_value(object)?;
            Ok(serde_json::to_value(downgrade_from_hub(&hub)?)?)
        }
        (from, to) => Err(OperatorError::UnsupportedConversion {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

fn upgrade_spec(src: &v1alpha1::HawtioSpec) -> v1::HawtioSpec {
    v1::HawtioSpec {
        deployment_type: src.deployment_type.map(upgrade_deployment_type),
        replicas: src.replicas,
        metadata_propagation: v1::HawtioMetadataPropagation {
            annotations: src.metadata_propagation.annotations.clone(),
            labels: src.metadata_propagation.labels.clone(),
        },
        route_host_name: src.route_host_name.clone(),
        route: v1::HawtioRoute {
            cert_secret: src.route.cert_secret.clone(),
            ca_cert: src.route.ca_cert.clone(),
        },
        external_routes: src.external_routes.clone(),
        auth: v1::HawtioAuth {
            client_cert_common_name: src.auth.client_cert_common_name.clone(),
            client_cert_expiration_date: src.auth.client_cert_expiration_date.clone(),
            client_cert_check_schedule: src.auth.client_cert_check_schedule.clone(),
            client_cert_expiration_period: src.auth.client_cert_expiration_period,
        },
        nginx: v1::HawtioNginx {
            client_body_buffer_size: src.nginx.client_body_buffer_size.clone(),
            proxy_buffers: src.nginx.proxy_buffers.clone(),
            subrequest_output_buffer_size: src.nginx.subrequest_output_buffer_size.clone(),
        },
        rbac: v1::HawtioRbac {
            config_map: src.rbac.config_map.clone(),
            disable_rbac_registry: src.rbac.disable_rbac_registry,
        },
        resources: src.resources.clone(),
        config: upgrade_config(&src.config),
    }
}

fn upgrade_deployment_type(src: v1alpha1::HawtioDeploymentType) -> v1::HawtioDeploymentType {
    match src {
        v1alpha1::HawtioDeploymentType::Cluster => v1::HawtioDeploymentType::Cluster,
        v1alpha1::HawtioDeploymentType::Namespace => v1::HawtioDeploymentType::Namespace,
    }
}

fn upgrade_config(src: &v1alpha1::HawtioConfig) -> v1::HawtioConfig {
    let about = &src.about;
    v1::HawtioConfig {
        about: v1::HawtioAbout {
            title: about.title.clone(),
            product_infos: upgrade_product_infos(&about.product_infos),
            additional_info: about.additional_info.clone(),
            copyright: about.copyright.clone(),
            img_src: about.img_src.clone(),
        },
        branding: v1::HawtioBranding {
            app_name: src.branding.app_name.clone(),
            app_logo_url: src.branding.app_logo_url.clone(),
            css: src.branding.css.clone(),
            favicon: src.branding.favicon.clone(),
        },
        online: v1::HawtioOnline {
            project_selector: src.online.project_selector.clone(),
            console_link: v1::HawtioConsoleLink {
                text: src.online.console_link.text.clone(),
                section: src.online.console_link.section.clone(),
                image_relative_path: src.online.console_link.image_relative_path.clone(),
            },
        },
        disabled_routes: src.disabled_routes.clone(),
    }
}

// Order is preserved and duplicates are kept. An empty source yields an empty,
// unallocated Vec.
fn upgrade_product_infos(src: &[v1alpha1::HawtioProductInfo]) -> Vec<v1::HawtioProductInfo> {
    if src.is_empty() {
        return Vec::new();
    }
    src.iter()
        .map(|info| v1::HawtioProductInfo {
            name: info.name.clone(),
            value: info.value.clone(),
        })
        .collect()
}

fn upgrade_status(src: &v1alpha1::HawtioStatus) -> v1::HawtioStatus {
    v1::HawtioStatus {
        phase: src.phase.as_ref().map(upgrade_phase),
        image: src.image.clone(),
        url: src.url.clone(),
        replicas: src.replicas,
        selector: src.selector.clone(),
    }
}

// Re-tags the raw string. Unknown values survive as `Unrecognized` so a strange
// status never blocks conversion.
fn upgrade_phase(src: &v1alpha1::HawtioPhase) -> v1::HawtioPhase {
    let phase = v1::HawtioPhase::from(src.0.clone());
    if let v1::HawtioPhase::Unrecognized(raw) = &phase {
        tracing::warn!(phase = %raw, "Carrying unrecognized v1alpha1 phase into v1");
    }
    phase
}
