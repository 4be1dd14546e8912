//! Phase derivation and status projection.
//!
//! The phase is recomputed from what is observed on every pass, never advanced
//! from the previously written value.

use crate::crd::openshift::Route;
use crate::crd::{HawtioPhase, HawtioStatus};
use crate::resources::selector_string;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::networking::v1::Ingress;

/// Phase of a Hawtio whose children have been applied.
///
/// `Deployed` once the Deployment controller has observed the current generation
/// and every desired replica is updated and ready. `Deploying` otherwise,
/// including when the Deployment is not visible yet.
pub fn derive_phase(deployment: Option<&Deployment>) -> HawtioPhase {
    let Some(deployment) = deployment else {
        return HawtioPhase::Deploying;
    };
    let Some(status) = deployment.status.as_ref() else {
        return HawtioPhase::Deploying;
    };

    let generation = deployment.metadata.generation.unwrap_or(0);
    if status.observed_generation.unwrap_or(0) < generation {
        return HawtioPhase::Deploying;
    }

    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let ready = status.ready_replicas.unwrap_or(0);
    let updated = status.updated_replicas.unwrap_or(0);

    if ready >= desired && updated >= desired {
        HawtioPhase::Deployed
    } else {
        HawtioPhase::Deploying
    }
}

/// Externally reachable URL of the console.
///
/// A Route's admitted host wins over its requested host. An Ingress rule host
/// wins over the load balancer address.
pub fn routing_url(route: Option<&Route>, ingress: Option<&Ingress>) -> Option<String> {
    let host = match (route, ingress) {
        (Some(route), _) => route
            .status
            .as_ref()
            .and_then(|s| s.ingress.iter().find_map(|i| i.host.clone()))
            .or_else(|| route.spec.host.clone()),
        (None, Some(ingress)) => ingress_host(ingress),
        (None, None) => None,
    };
    host.filter(|h| !h.is_empty()).map(|h| format!("https://{h}"))
}

fn ingress_host(ingress: &Ingress) -> Option<String> {
    let rule_host = ingress
        .spec
        .as_ref()
        .and_then(|s| s.rules.as_ref())
        .and_then(|rules| rules.iter().find_map(|r| r.host.clone()));
    if rule_host.is_some() {
        return rule_host;
    }

    ingress
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|entries| {
            entries
                .iter()
                .find_map(|e| e.hostname.clone().or_else(|| e.ip.clone()))
        })
}

/// The full status of a reconciled Hawtio.
///
/// A ready Deployment is reported `Deployed` only once the console is routable.
/// Until the Route or Ingress exposes a host the phase stays `Deploying`.
pub fn project_status(
    name: &str,
    image: &str,
    deployment: Option<&Deployment>,
    url: Option<String>,
) -> HawtioStatus {
    let phase = match derive_phase(deployment) {
        HawtioPhase::Deployed if url.is_none() => HawtioPhase::Deploying,
        phase => phase,
    };
    HawtioStatus {
        phase: Some(phase),
        image: Some(image.to_string()),
        url,
        replicas: deployment
            .and_then(|d| d.status.as_ref())
            .and_then(|s| s.replicas),
        selector: Some(selector_string(name)),
    }
}
