//! Desired state of a Hawtio's children.

use crate::capabilities::CapabilitySnapshot;
use crate::config::OperatorConfig;
use crate::crd::openshift::{ConsoleLink, Route};
use crate::crd::{Hawtio, HawtioDeploymentType};
use crate::error::OperatorResult;
use crate::resources::{
    APPLIED_HASH_ANNOTATION, ChildBuilder, DeploymentSettings, OWNER_NAME_LABEL,
    OWNER_NAMESPACE_LABEL, RouteTls, Scope, console_link_name, covers, desired_hash,
};
use crate::store::{ObjectKey, to_dynamic};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use kube::core::DynamicObject;
use serde::Serialize;
use std::collections::BTreeMap;

/// Routing primitive exposing the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// OpenShift Route.
    Route,
    /// Kubernetes Ingress.
    Ingress,
}

/// Everything the controller writes for one Hawtio.
#[derive(Debug, Clone)]
pub struct ChildPlan {
    /// Discovery scope of the console.
    pub scope: Scope,
    /// Routing primitive in use.
    pub routing: Routing,
    /// Console image.
    pub image: String,
    /// Children to create or update, in apply order, each stamped with its hash.
    pub apply: Vec<DynamicObject>,
    /// Children of the routing kind not in use, deleted when owned by the Hawtio.
    pub prune: Vec<ObjectKey>,
}

/// Resolve which namespaces the console discovers.
///
/// A missing type behaves as `Namespace`. `Cluster` honours
/// `config.online.projectSelector` only on OpenShift: plain Kubernetes has no
/// project primitive, so the selector is accepted there but has no effect.
pub fn resolve_scope(hawtio: &Hawtio, caps: &CapabilitySnapshot) -> Scope {
    match hawtio.spec.deployment_type.unwrap_or_default() {
        HawtioDeploymentType::Namespace => Scope::Namespace {
            namespace: hawtio.namespace().unwrap_or_default(),
        },
        HawtioDeploymentType::Cluster => {
            let selector = hawtio.spec.config.online.project_selector.clone();
            if caps.is_extended_platform {
                Scope::Cluster {
                    project_selector: selector,
                }
            } else {
                if let Some(selector) = selector {
                    tracing::warn!(
                        name = %hawtio.name_any(),
                        selector = %selector,
                        "Project selector has no effect outside OpenShift, ignoring"
                    );
                }
                Scope::Cluster {
                    project_selector: None,
                }
            }
        }
    }
}

/// Compute the children of `hawtio` for the given capabilities.
///
/// The routing branch is decided fresh from `caps` each time, so a capability
/// change swaps the routing kind on the next pass.
pub fn plan_children(
    hawtio: &Hawtio,
    caps: &CapabilitySnapshot,
    config: &OperatorConfig,
    route_tls: &RouteTls,
) -> OperatorResult<ChildPlan> {
    let builder = ChildBuilder::new(hawtio)?;
    let scope = resolve_scope(hawtio, caps);
    let image = config.image();
    let serving_cert = caps.is_extended_platform;

    let settings = DeploymentSettings {
        image: image.clone(),
        scope: scope.clone(),
        console_url: caps.console_url.clone(),
        serving_cert,
    };

    let mut apply = vec![
        stamped(&builder.config_map()?)?,
        stamped(&builder.deployment(&settings))?,
        stamped(&builder.service(serving_cert))?,
    ];

    let namespace = Some(builder.namespace());
    let (routing, prune) = if caps.routes_available {
        apply.push(stamped(&builder.route(route_tls))?);
        (
            Routing::Route,
            ObjectKey::of::<Ingress>(namespace, builder.name()),
        )
    } else {
        apply.push(stamped(&builder.ingress())?);
        (
            Routing::Ingress,
            ObjectKey::of::<Route>(namespace, builder.name()),
        )
    };

    Ok(ChildPlan {
        scope,
        routing,
        image,
        apply,
        prune: vec![prune],
    })
}

/// The web console link of `hawtio`, once the console is routable through a
/// Route on OpenShift. `None` means no link should exist.
pub fn plan_console_link(
    hawtio: &Hawtio,
    caps: &CapabilitySnapshot,
    plan: &ChildPlan,
    url: Option<&str>,
) -> OperatorResult<Option<DynamicObject>> {
    if !caps.is_extended_platform || plan.routing != Routing::Route {
        return Ok(None);
    }
    let Some(url) = url else {
        return Ok(None);
    };
    let builder = ChildBuilder::new(hawtio)?;
    Ok(Some(stamped(&builder.console_link(url, &plan.scope))?))
}

/// Key of the web console link of `hawtio`.
pub fn console_link_key(hawtio: &Hawtio) -> ObjectKey {
    let namespace = hawtio.namespace().unwrap_or_default();
    ObjectKey::of::<ConsoleLink>(None, &console_link_name(&namespace, &hawtio.name_any()))
}

/// Whether a live ConsoleLink was created for `hawtio`.
pub fn owns_console_link(hawtio: &Hawtio, live: &DynamicObject) -> bool {
    let labels = live.labels();
    labels.get(OWNER_NAMESPACE_LABEL) == hawtio.namespace().as_ref()
        && labels.get(OWNER_NAME_LABEL) == Some(&hawtio.name_any())
}

/// Hash of the applied state recorded on a child, if any.
fn applied_hash(obj: &DynamicObject) -> Option<&str> {
    obj.metadata
        .annotations
        .as_ref()?
        .get(APPLIED_HASH_ANNOTATION)
        .map(String::as_str)
}

/// Whether `live` already holds the state of `desired`.
///
/// The stamped hash catches changes of the desired state itself. The field
/// comparison catches edits made directly to the child: every desired label,
/// annotation and body field must still be present with the desired value.
pub(crate) fn in_sync(live: &DynamicObject, desired: &DynamicObject) -> bool {
    if applied_hash(live) != applied_hash(desired) {
        return false;
    }

    if !contains_all(&live.metadata.labels, &desired.metadata.labels)
        || !contains_all(&live.metadata.annotations, &desired.metadata.annotations)
    {
        return false;
    }

    let mut body = desired.data.clone();
    if let Some(map) = body.as_object_mut() {
        map.remove("status");
    }
    covers(&live.data, &body)
}

fn contains_all(
    have: &Option<BTreeMap<String, String>>,
    want: &Option<BTreeMap<String, String>>,
) -> bool {
    want.iter()
        .flatten()
        .all(|(k, v)| have.as_ref().and_then(|h| h.get(k)) == Some(v))
}

fn stamped<K: Serialize>(obj: &K) -> OperatorResult<DynamicObject> {
    let hash = desired_hash(&serde_json::to_value(obj)?)?;
    let mut obj = to_dynamic(obj)?;
    obj.annotations_mut()
        .insert(APPLIED_HASH_ANNOTATION.to_string(), hash);
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{HawtioConfig, HawtioOnline, HawtioSpec};

    fn hawtio(deployment_type: Option<HawtioDeploymentType>) -> Hawtio {
        let mut h = Hawtio::new(
            "console",
            HawtioSpec {
                deployment_type,
                config: HawtioConfig {
                    online: HawtioOnline {
                        project_selector: Some("team=a".into()),
                        ..Default::default()
                    },
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        h.metadata.namespace = Some("hawtio".into());
        h.metadata.uid = Some("1234".into());
        h
    }

    fn openshift() -> CapabilitySnapshot {
        CapabilitySnapshot {
            is_extended_platform: true,
            routes_available: true,
            console_url: Some("https://console.example.com".into()),
            platform_version: Some("4.19.0".into()),
        }
    }

    fn kinds(plan: &ChildPlan) -> Vec<String> {
        plan.apply
            .iter()
            .map(|o| o.types.as_ref().unwrap().kind.clone())
            .collect()
    }

    #[test]
    fn missing_type_is_namespace_scoped() {
        let scope = resolve_scope(&hawtio(None), &CapabilitySnapshot::default());
        assert_eq!(
            scope,
            Scope::Namespace {
                namespace: "hawtio".into()
            }
        );
    }

    #[test]
    fn project_selector_only_applies_on_openshift() {
        let h = hawtio(Some(HawtioDeploymentType::Cluster));
        assert_eq!(
            resolve_scope(&h, &openshift()),
            Scope::Cluster {
                project_selector: Some("team=a".into())
            }
        );
        assert_eq!(
            resolve_scope(&h, &CapabilitySnapshot::default()),
            Scope::Cluster {
                project_selector: None
            }
        );
    }

    #[test]
    fn kubernetes_plans_an_ingress_and_prunes_routes() {
        let plan = plan_children(
            &hawtio(None),
            &CapabilitySnapshot::default(),
            &OperatorConfig::default(),
            &RouteTls::default(),
        )
        .unwrap();

        assert_eq!(plan.routing, Routing::Ingress);
        assert_eq!(kinds(&plan), ["ConfigMap", "Deployment", "Service", "Ingress"]);
        assert_eq!(plan.prune[0].kind, "Route");
        assert_eq!(plan.prune[0].group, "route.openshift.io");
    }

    #[test]
    fn routes_plan_a_route_and_prune_ingresses() {
        let plan = plan_children(
            &hawtio(None),
            &openshift(),
            &OperatorConfig::default(),
            &RouteTls::default(),
        )
        .unwrap();

        assert_eq!(plan.routing, Routing::Route);
        assert_eq!(kinds(&plan), ["ConfigMap", "Deployment", "Service", "Route"]);
        assert_eq!(plan.prune[0].kind, "Ingress");
    }

    #[test]
    fn every_child_is_stamped() {
        let h = hawtio(None);
        let caps = CapabilitySnapshot::default();
        let config = OperatorConfig::default();
        let first = plan_children(&h, &caps, &config, &RouteTls::default()).unwrap();
        let second = plan_children(&h, &caps, &config, &RouteTls::default()).unwrap();

        for (a, b) in first.apply.iter().zip(&second.apply) {
            assert!(applied_hash(a).is_some());
            assert_eq!(applied_hash(a), applied_hash(b));
        }
    }

    #[test]
    fn direct_edits_break_sync() {
        let plan = plan_children(
            &hawtio(None),
            &CapabilitySnapshot::default(),
            &OperatorConfig::default(),
            &RouteTls::default(),
        )
        .unwrap();
        let desired = &plan.apply[1];

        let mut live = desired.clone();
        live.metadata.resource_version = Some("7".into());
        live.data["status"] = serde_json::json!({ "replicas": 1 });
        assert!(in_sync(&live, desired));

        let mut scaled = live.clone();
        scaled.data["spec"]["replicas"] = serde_json::json!(7);
        assert!(!in_sync(&scaled, desired));

        let mut relabelled = live.clone();
        relabelled.labels_mut().remove("deployment");
        assert!(!in_sync(&relabelled, desired));
    }

    #[test]
    fn console_link_needs_openshift_routing_and_a_url() {
        let h = hawtio(Some(HawtioDeploymentType::Cluster));
        let config = OperatorConfig::default();
        let url = Some("https://hawtio.apps.example.com");

        let plan = plan_children(&h, &openshift(), &config, &RouteTls::default()).unwrap();
        let link = plan_console_link(&h, &openshift(), &plan, url)
            .unwrap()
            .unwrap();
        assert_eq!(ObjectKey::from_dynamic(&link).unwrap(), console_link_key(&h));
        assert!(applied_hash(&link).is_some());
        assert!(owns_console_link(&h, &link));
        assert!(plan_console_link(&h, &openshift(), &plan, None).unwrap().is_none());

        let plain = CapabilitySnapshot {
            routes_available: true,
            ..Default::default()
        };
        let plan = plan_children(&h, &plain, &config, &RouteTls::default()).unwrap();
        assert!(plan_console_link(&h, &plain, &plan, url).unwrap().is_none());
    }
}
