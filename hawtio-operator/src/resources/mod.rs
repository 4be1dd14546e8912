//! Builders for the Kubernetes resources owned by a Hawtio.
//!
//! Builders are pure: they turn a Hawtio plus the decisions made by the controller
//! into the desired objects, and never touch the cluster.

mod propagation;

pub use propagation::KeyMatcher;

use crate::crd::openshift::{
    APPLICATION_MENU, ApplicationMenuSpec, ConsoleLink, ConsoleLinkSpec, NAMESPACE_DASHBOARD,
    NamespaceDashboardSpec, Route, RoutePort, RouteSpec, RouteTargetReference, TlsConfig,
};
use crate::crd::{Hawtio, HawtioDeploymentType};
use crate::error::{OperatorError, OperatorResult};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EnvVar, HTTPGetAction,
    PodSpec, PodTemplateSpec, Probe, SecretVolumeSource, Service, ServicePort, ServiceSpec,
    Volume, VolumeMount,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Label identifying the application.
pub const APP_LABEL: &str = "app";

/// Value of [`APP_LABEL`].
pub const APP_NAME: &str = "hawtio";

/// Label carrying the owning Hawtio's name.
pub const DEPLOYMENT_LABEL: &str = "deployment";

/// Annotation holding the hash of the last applied desired state.
pub const APPLIED_HASH_ANNOTATION: &str = "hawt.io/applied-hash";

/// Annotation asking OpenShift to issue a serving certificate for a Service.
pub const SERVING_CERT_ANNOTATION: &str = "service.beta.openshift.io/serving-cert-secret-name";

/// Label carrying the namespace of the Hawtio a cluster scoped child belongs to.
pub const OWNER_NAMESPACE_LABEL: &str = "hawt.io/owner-namespace";

/// Label carrying the name of the Hawtio a cluster scoped child belongs to.
pub const OWNER_NAME_LABEL: &str = "hawt.io/owner-name";

/// Port the console container listens on.
pub const CONTAINER_PORT: i32 = 8443;

/// Port the Service exposes.
pub const SERVICE_PORT: i32 = 443;

const DEFAULT_LINK_TEXT: &str = "Hawtio Console";
const DEFAULT_LINK_SECTION: &str = "Monitoring";
const DEFAULT_LINK_IMAGE: &str = "/online/img/favicon.ico";
const CONTAINER_NAME: &str = "hawtio-online";
const PORT_NAME: &str = "https";
const CONFIG_FILE: &str = "hawtconfig.json";
const CONFIG_MOUNT_PATH: &str = "/usr/share/nginx/html/online/hawtconfig.json";
const RBAC_MOUNT_PATH: &str = "/etc/hawtio/rbac";
const SERVING_CERT_MOUNT_PATH: &str = "/etc/tls/private/serving";

/// Labels selecting the console pods of `name`.
pub fn selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), APP_NAME.to_string()),
        (DEPLOYMENT_LABEL.to_string(), name.to_string()),
    ])
}

/// [`selector_labels`] rendered as a label selector string.
pub fn selector_string(name: &str) -> String {
    selector_labels(name)
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Name of the ConfigMap holding `hawtconfig.json`.
pub fn config_map_name(name: &str) -> String {
    format!("{name}-config")
}

/// Name of the Secret OpenShift issues the serving certificate into.
pub fn serving_cert_secret_name(name: &str) -> String {
    format!("{name}-tls-serving")
}

/// Name of the cluster scoped ConsoleLink of the Hawtio `name` in `namespace`.
pub fn console_link_name(namespace: &str, name: &str) -> String {
    format!("{namespace}-{name}")
}

/// Which pods the console discovers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Only the Hawtio's own namespace.
    Namespace {
        /// The namespace.
        namespace: String,
    },
    /// Every namespace the operator can see, optionally narrowed by a project selector.
    Cluster {
        /// Project label selector, OpenShift only.
        project_selector: Option<String>,
    },
}

impl Scope {
    /// The deployment type this scope realises.
    pub fn deployment_type(&self) -> HawtioDeploymentType {
        match self {
            Scope::Namespace { .. } => HawtioDeploymentType::Namespace,
            Scope::Cluster { .. } => HawtioDeploymentType::Cluster,
        }
    }
}

/// Inputs of the console Deployment decided by the controller.
#[derive(Debug, Clone)]
pub struct DeploymentSettings {
    /// Console image.
    pub image: String,
    /// Discovery scope.
    pub scope: Scope,
    /// OpenShift web console URL.
    pub console_url: Option<String>,
    /// Mount the OpenShift issued serving certificate.
    pub serving_cert: bool,
}

/// PEM material for a re-encrypting Route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTls {
    /// Certificate presented to clients.
    pub certificate: Option<String>,
    /// Key of `certificate`.
    pub key: Option<String>,
    /// CA used to verify the console pods.
    pub destination_ca_certificate: Option<String>,
}

/// Builds the children of one Hawtio.
pub struct ChildBuilder<'a> {
    hawtio: &'a Hawtio,
    name: String,
    namespace: String,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
}

impl<'a> ChildBuilder<'a> {
    /// Prepare a builder, resolving which labels and annotations to propagate.
    pub fn new(hawtio: &'a Hawtio) -> OperatorResult<Self> {
        let name = hawtio.name_any();
        let namespace = hawtio
            .namespace()
            .ok_or_else(|| OperatorError::InvalidConfig("Hawtio must be namespaced".into()))?;

        let propagation = &hawtio.spec.metadata_propagation;
        let mut labels =
            KeyMatcher::new(&propagation.labels)?.select(hawtio.metadata.labels.as_ref());
        // Selector labels are never overridden by propagated ones.
        labels.extend(selector_labels(&name));

        let mut annotations = KeyMatcher::new(&propagation.annotations)?
            .select(hawtio.metadata.annotations.as_ref());
        annotations.remove(APPLIED_HASH_ANNOTATION);

        Ok(Self {
            hawtio,
            name,
            namespace,
            labels,
            annotations,
        })
    }

    /// Name shared by the Deployment, Service, Route and Ingress.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace of every child.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Metadata common to every child: labels, propagated annotations and the
    /// controller owner reference.
    pub fn metadata(&self, name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.labels.clone()),
            annotations: (!self.annotations.is_empty()).then(|| self.annotations.clone()),
            owner_references: self.hawtio.controller_owner_ref(&()).map(|o| vec![o]),
            ..Default::default()
        }
    }

    /// ConfigMap carrying the console configuration.
    pub fn config_map(&self) -> OperatorResult<ConfigMap> {
        let config = serde_json::to_string_pretty(&self.hawtio.spec.config)?;
        Ok(ConfigMap {
            metadata: self.metadata(&config_map_name(&self.name)),
            data: Some(BTreeMap::from([(CONFIG_FILE.to_string(), config)])),
            ..Default::default()
        })
    }

    /// The console Deployment.
    pub fn deployment(&self, settings: &DeploymentSettings) -> Deployment {
        let spec = &self.hawtio.spec;

        let mut volumes = vec![Volume {
            name: "hawtio-config".to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map_name(&self.name),
                ..Default::default()
            }),
            ..Default::default()
        }];
        let mut mounts = vec![VolumeMount {
            name: "hawtio-config".to_string(),
            mount_path: CONFIG_MOUNT_PATH.to_string(),
            sub_path: Some(CONFIG_FILE.to_string()),
            read_only: Some(true),
            ..Default::default()
        }];

        if let Some(rbac) = &spec.rbac.config_map {
            volumes.push(Volume {
                name: "hawtio-rbac".to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: rbac.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            });
            mounts.push(VolumeMount {
                name: "hawtio-rbac".to_string(),
                mount_path: RBAC_MOUNT_PATH.to_string(),
                read_only: Some(true),
                ..Default::default()
            });
        }

        if settings.serving_cert {
            volumes.push(Volume {
                name: "hawtio-serving-cert".to_string(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(serving_cert_secret_name(&self.name)),
                    ..Default::default()
                }),
                ..Default::default()
            });
            mounts.push(VolumeMount {
                name: "hawtio-serving-cert".to_string(),
                mount_path: SERVING_CERT_MOUNT_PATH.to_string(),
                read_only: Some(true),
                ..Default::default()
            });
        }

        let probe = Probe {
            http_get: Some(HTTPGetAction {
                path: Some("/online".to_string()),
                port: IntOrString::Int(CONTAINER_PORT),
                scheme: Some("HTTPS".to_string()),
                ..Default::default()
            }),
            period_seconds: Some(10),
            ..Default::default()
        };

        let mut template_meta = self.metadata(&self.name);
        template_meta.name = None;
        template_meta.namespace = None;
        template_meta.owner_references = None;

        Deployment {
            metadata: self.metadata(&self.name),
            spec: Some(DeploymentSpec {
                replicas: Some(spec.replicas.unwrap_or(1)),
                selector: LabelSelector {
                    match_labels: Some(selector_labels(&self.name)),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(template_meta),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: CONTAINER_NAME.to_string(),
                            image: Some(settings.image.clone()),
                            ports: Some(vec![ContainerPort {
                                name: Some(PORT_NAME.to_string()),
                                container_port: CONTAINER_PORT,
                                ..Default::default()
                            }]),
                            env: Some(self.env(settings)),
                            resources: spec.resources.clone(),
                            readiness_probe: Some(probe.clone()),
                            liveness_probe: Some(Probe {
                                initial_delay_seconds: Some(10),
                                ..probe
                            }),
                            volume_mounts: Some(mounts),
                            ..Default::default()
                        }],
                        volumes: Some(volumes),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn env(&self, settings: &DeploymentSettings) -> Vec<EnvVar> {
        let spec = &self.hawtio.spec;
        let mut env = Vec::new();
        let mut push = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                env.push(EnvVar {
                    name: name.to_string(),
                    value: Some(value),
                    ..Default::default()
                });
            }
        };

        match &settings.scope {
            Scope::Namespace { namespace } => {
                push("HAWTIO_ONLINE_MODE", Some("namespace".into()));
                push("HAWTIO_ONLINE_NAMESPACE", Some(namespace.clone()));
            }
            Scope::Cluster { project_selector } => {
                push("HAWTIO_ONLINE_MODE", Some("cluster".into()));
                push("HAWTIO_ONLINE_PROJECT_SELECTOR", project_selector.clone());
            }
        }

        push(
            "NGINX_CLIENT_BODY_BUFFER_SIZE",
            spec.nginx.client_body_buffer_size.clone(),
        );
        push("NGINX_PROXY_BUFFERS", spec.nginx.proxy_buffers.clone());
        push(
            "NGINX_SUBREQUEST_OUTPUT_BUFFER_SIZE",
            spec.nginx.subrequest_output_buffer_size.clone(),
        );
        push(
            "HAWTIO_ONLINE_RBAC_ACL",
            spec.rbac
                .config_map
                .as_ref()
                .map(|_| format!("{RBAC_MOUNT_PATH}/ACL.yaml")),
        );
        push(
            "HAWTIO_ONLINE_DISABLE_RBAC_REGISTRY",
            spec.rbac.disable_rbac_registry.map(|v| v.to_string()),
        );
        push("OPENSHIFT_WEB_CONSOLE_URL", settings.console_url.clone());
        push(
            "HAWTIO_ONLINE_EXTERNAL_ROUTES",
            (!spec.external_routes.is_empty()).then(|| spec.external_routes.join(",")),
        );

        env
    }

    /// Service in front of the console pods.
    pub fn service(&self, serving_cert: bool) -> Service {
        let mut metadata = self.metadata(&self.name);
        if serving_cert {
            metadata.annotations.get_or_insert_with(BTreeMap::new).insert(
                SERVING_CERT_ANNOTATION.to_string(),
                serving_cert_secret_name(&self.name),
            );
        }

        Service {
            metadata,
            spec: Some(ServiceSpec {
                selector: Some(selector_labels(&self.name)),
                ports: Some(vec![ServicePort {
                    name: Some(PORT_NAME.to_string()),
                    port: SERVICE_PORT,
                    target_port: Some(IntOrString::Int(CONTAINER_PORT)),
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Ingress used when routes are unavailable. It carries no host, so the
    /// ingress controller's default host serves the console.
    pub fn ingress(&self) -> Ingress {
        let mut metadata = self.metadata(&self.name);
        metadata.annotations.get_or_insert_with(BTreeMap::new).insert(
            "nginx.ingress.kubernetes.io/backend-protocol".to_string(),
            "HTTPS".to_string(),
        );

        Ingress {
            metadata,
            spec: Some(IngressSpec {
                rules: Some(vec![IngressRule {
                    host: None,
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some("/".to_string()),
                            path_type: "Prefix".to_string(),
                            backend: IngressBackend {
                                service: Some(IngressServiceBackend {
                                    name: self.name.clone(),
                                    port: Some(ServiceBackendPort {
                                        number: Some(SERVICE_PORT),
                                        ..Default::default()
                                    }),
                                }),
                                ..Default::default()
                            },
                        }],
                    }),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Route used when routes are available.
    pub fn route(&self, tls: &RouteTls) -> Route {
        let spec = RouteSpec {
            host: self
                .hawtio
                .spec
                .route_host_name
                .clone()
                .filter(|h| !h.is_empty()),
            to: RouteTargetReference {
                kind: "Service".to_string(),
                name: self.name.clone(),
            },
            port: Some(RoutePort {
                target_port: IntOrString::String(PORT_NAME.to_string()),
            }),
            tls: Some(TlsConfig {
                termination: "reencrypt".to_string(),
                insecure_edge_termination_policy: Some("Redirect".to_string()),
                certificate: tls.certificate.clone(),
                key: tls.key.clone(),
                destination_ca_certificate: tls.destination_ca_certificate.clone(),
                ..Default::default()
            }),
        };
        let mut route = Route::new(&self.name, spec);
        route.metadata = self.metadata(&self.name);
        route
    }

    /// OpenShift web console link to the console at `url`.
    ///
    /// ConsoleLinks are cluster scoped, so they cannot carry an owner reference to
    /// the Hawtio. They are labelled with its namespace and name instead.
    pub fn console_link(&self, url: &str, scope: &Scope) -> ConsoleLink {
        let link = &self.hawtio.spec.config.online.console_link;
        let text = link.text.clone().unwrap_or_else(|| DEFAULT_LINK_TEXT.to_string());

        let spec = match scope {
            Scope::Cluster { .. } => {
                let image = link
                    .image_relative_path
                    .as_deref()
                    .unwrap_or(DEFAULT_LINK_IMAGE);
                ConsoleLinkSpec {
                    href: url.to_string(),
                    text,
                    location: APPLICATION_MENU.to_string(),
                    application_menu: Some(ApplicationMenuSpec {
                        section: link
                            .section
                            .clone()
                            .unwrap_or_else(|| DEFAULT_LINK_SECTION.to_string()),
                        image_url: Some(format!("{url}{image}")),
                    }),
                    namespace_dashboard: None,
                }
            }
            Scope::Namespace { namespace } => ConsoleLinkSpec {
                href: url.to_string(),
                text,
                location: NAMESPACE_DASHBOARD.to_string(),
                application_menu: None,
                namespace_dashboard: Some(NamespaceDashboardSpec {
                    namespaces: vec![namespace.clone()],
                }),
            },
        };

        let name = console_link_name(&self.namespace, &self.name);
        let mut labels = self.labels.clone();
        labels.insert(OWNER_NAMESPACE_LABEL.to_string(), self.namespace.clone());
        labels.insert(OWNER_NAME_LABEL.to_string(), self.name.clone());

        let mut console_link = ConsoleLink::new(&name, spec);
        console_link.metadata = ObjectMeta {
            name: Some(name),
            labels: Some(labels),
            annotations: (!self.annotations.is_empty()).then(|| self.annotations.clone()),
            ..Default::default()
        };
        console_link
    }
}

/// Hash of an object's desired state, ignoring any previously stamped hash.
pub fn desired_hash(obj: &serde_json::Value) -> OperatorResult<String> {
    let mut obj = obj.clone();
    if let Some(metadata) = obj.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        let now_empty = metadata
            .get_mut("annotations")
            .and_then(|a| a.as_object_mut())
            .map(|a| {
                a.remove(APPLIED_HASH_ANNOTATION);
                a.is_empty()
            })
            .unwrap_or(false);
        if now_empty {
            metadata.remove("annotations");
        }
    }
    let digest = Sha256::digest(serde_json::to_vec(&obj)?);
    Ok(format!("{digest:x}"))
}

/// Whether `live` carries every value set in `desired`.
///
/// Fields the API server fills in on its own, such as defaults and allocated
/// addresses, are absent from `desired` and therefore ignored. Lists must match
/// element by element.
pub fn covers(live: &serde_json::Value, desired: &serde_json::Value) -> bool {
    use serde_json::Value;

    match (live, desired) {
        (_, Value::Null) => true,
        (Value::Object(live), Value::Object(desired)) => desired.iter().all(|(key, want)| {
            match live.get(key) {
                Some(have) => covers(have, want),
                None => is_empty(want),
            }
        }),
        (Value::Array(live), Value::Array(desired)) => {
            live.len() == desired.len()
                && live.iter().zip(desired).all(|(have, want)| covers(have, want))
        }
        (Value::Null, want) => is_empty(want),
        (have, want) => have == want,
    }
}

fn is_empty(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{HawtioMetadataPropagation, HawtioRbac, HawtioSpec};

    fn hawtio(spec: HawtioSpec) -> Hawtio {
        let mut h = Hawtio::new("console", spec);
        h.metadata.namespace = Some("hawtio".into());
        h.metadata.uid = Some("1234".into());
        h.metadata.labels = Some(BTreeMap::from([
            ("team".to_string(), "a".to_string()),
            ("app".to_string(), "spoofed".to_string()),
        ]));
        h.metadata.annotations = Some(BTreeMap::from([(
            "example.com/contact".to_string(),
            "ops@example.com".to_string(),
        )]));
        h
    }

    fn settings(scope: Scope) -> DeploymentSettings {
        DeploymentSettings {
            image: "quay.io/hawtio/online:latest".into(),
            scope,
            console_url: None,
            serving_cert: false,
        }
    }

    fn env_value(deployment: &Deployment, name: &str) -> Option<String> {
        deployment.spec.as_ref()?.template.spec.as_ref()?.containers[0]
            .env
            .as_ref()?
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.value.clone())
    }

    #[test]
    fn selector_string_is_stable() {
        assert_eq!(selector_string("console"), "app=hawtio,deployment=console");
    }

    #[test]
    fn children_are_owned_and_labelled() {
        let h = hawtio(HawtioSpec {
            metadata_propagation: HawtioMetadataPropagation {
                labels: vec!["team".into(), "app".into()],
                annotations: vec!["example.com/*".into()],
            },
            ..Default::default()
        });
        let builder = ChildBuilder::new(&h).unwrap();
        let meta = builder.metadata("console");

        let labels = meta.labels.unwrap();
        assert_eq!(labels["team"], "a");
        assert_eq!(labels["app"], "hawtio");
        assert_eq!(labels["deployment"], "console");
        assert_eq!(
            meta.annotations.unwrap()["example.com/contact"],
            "ops@example.com"
        );

        let owner = &meta.owner_references.unwrap()[0];
        assert_eq!(owner.kind, "Hawtio");
        assert_eq!(owner.uid, "1234");
        assert_eq!(owner.controller, Some(true));
    }

    #[test]
    fn namespace_scope_sets_mode_and_namespace() {
        let h = hawtio(HawtioSpec::default());
        let deployment = ChildBuilder::new(&h).unwrap().deployment(&settings(Scope::Namespace {
            namespace: "hawtio".into(),
        }));

        assert_eq!(deployment.spec.as_ref().unwrap().replicas, Some(1));
        assert_eq!(
            env_value(&deployment, "HAWTIO_ONLINE_MODE").as_deref(),
            Some("namespace")
        );
        assert_eq!(
            env_value(&deployment, "HAWTIO_ONLINE_NAMESPACE").as_deref(),
            Some("hawtio")
        );
        assert!(env_value(&deployment, "HAWTIO_ONLINE_PROJECT_SELECTOR").is_none());
    }

    #[test]
    fn cluster_scope_and_rbac_flow_into_env() {
        let h = hawtio(HawtioSpec {
            replicas: Some(2),
            rbac: HawtioRbac {
                config_map: Some("acl".into()),
                disable_rbac_registry: Some(true),
            },
            ..Default::default()
        });
        let deployment = ChildBuilder::new(&h).unwrap().deployment(&settings(Scope::Cluster {
            project_selector: Some("team=a".into()),
        }));

        assert_eq!(deployment.spec.as_ref().unwrap().replicas, Some(2));
        assert_eq!(
            env_value(&deployment, "HAWTIO_ONLINE_MODE").as_deref(),
            Some("cluster")
        );
        assert_eq!(
            env_value(&deployment, "HAWTIO_ONLINE_PROJECT_SELECTOR").as_deref(),
            Some("team=a")
        );
        assert_eq!(
            env_value(&deployment, "HAWTIO_ONLINE_RBAC_ACL").as_deref(),
            Some("/etc/hawtio/rbac/ACL.yaml")
        );
        assert_eq!(
            env_value(&deployment, "HAWTIO_ONLINE_DISABLE_RBAC_REGISTRY").as_deref(),
            Some("true")
        );
    }

    #[test]
    fn route_honours_host_override() {
        let h = hawtio(HawtioSpec {
            route_host_name: Some("hawtio.apps.example.com".into()),
            ..Default::default()
        });
        let route = ChildBuilder::new(&h).unwrap().route(&RouteTls::default());
        assert_eq!(route.spec.host.as_deref(), Some("hawtio.apps.example.com"));
        assert_eq!(route.spec.to.name, "console");
        assert_eq!(route.spec.tls.unwrap().termination, "reencrypt");
    }

    #[test]
    fn hash_ignores_previous_stamp() {
        let h = hawtio(HawtioSpec::default());
        let mut svc = serde_json::to_value(ChildBuilder::new(&h).unwrap().service(false)).unwrap();
        let before = desired_hash(&svc).unwrap();
        svc["metadata"]["annotations"] = serde_json::json!({ APPLIED_HASH_ANNOTATION: before });
        assert_eq!(desired_hash(&svc).unwrap(), before);
    }

    #[test]
    fn unnamespaced_hawtio_is_rejected() {
        let h = Hawtio::new("console", HawtioSpec::default());
        assert!(ChildBuilder::new(&h).is_err());
    }

    #[test]
    fn defaulted_fields_do_not_count_as_drift() {
        let desired = serde_json::json!({
            "spec": {
                "replicas": 1,
                "ports": [{ "name": "https", "port": 443 }],
                "args": []
            }
        });
        let live = serde_json::json!({
            "spec": {
                "replicas": 1,
                "clusterIP": "10.96.0.12",
                "ports": [{ "name": "https", "port": 443, "protocol": "TCP" }]
            }
        });
        assert!(covers(&live, &desired));
    }

    #[test]
    fn changed_or_missing_values_are_drift() {
        let desired = serde_json::json!({
            "labels": { "team": "a" },
            "spec": { "replicas": 1, "ports": [{ "port": 443 }] }
        });

        let scaled = serde_json::json!({
            "labels": { "team": "a" },
            "spec": { "replicas": 7, "ports": [{ "port": 443 }] }
        });
        assert!(!covers(&scaled, &desired));

        let stripped = serde_json::json!({
            "labels": {},
            "spec": { "replicas": 1, "ports": [{ "port": 443 }] }
        });
        assert!(!covers(&stripped, &desired));

        let extra_port = serde_json::json!({
            "labels": { "team": "a" },
            "spec": { "replicas": 1, "ports": [{ "port": 443 }, { "port": 80 }] }
        });
        assert!(!covers(&extra_port, &desired));
    }

    #[test]
    fn console_link_placement_follows_scope() {
        let h = hawtio(HawtioSpec::default());
        let builder = ChildBuilder::new(&h).unwrap();

        let cluster = builder.console_link(
            "https://hawtio.apps.example.com",
            &Scope::Cluster {
                project_selector: None,
            },
        );
        assert_eq!(cluster.name_any(), "hawtio-console");
        assert_eq!(cluster.namespace(), None);
        assert!(cluster.metadata.owner_references.is_none());
        assert_eq!(cluster.spec.location, "ApplicationMenu");
        assert_eq!(cluster.spec.text, "Hawtio Console");
        let menu = cluster.spec.application_menu.unwrap();
        assert_eq!(menu.section, "Monitoring");
        assert_eq!(
            menu.image_url.as_deref(),
            Some("https://hawtio.apps.example.com/online/img/favicon.ico")
        );
        let labels = cluster.metadata.labels.unwrap();
        assert_eq!(labels[OWNER_NAMESPACE_LABEL], "hawtio");
        assert_eq!(labels[OWNER_NAME_LABEL], "console");

        let namespaced = builder.console_link(
            "https://hawtio.apps.example.com",
            &Scope::Namespace {
                namespace: "hawtio".into(),
            },
        );
        assert_eq!(namespaced.spec.location, "NamespaceDashboard");
        assert_eq!(
            namespaced.spec.namespace_dashboard.unwrap().namespaces,
            vec!["hawtio".to_string()]
        );
    }
}
