//! Hawtio controller.
//!
//! Reconciles `v1` Hawtio resources into a ConfigMap, Deployment, Service and a
//! Route or Ingress, then projects the observed state into the status.

use super::phase::{project_status, routing_url};
use super::plan::{
    ChildPlan, Routing, console_link_key, in_sync, owns_console_link, plan_children,
    plan_console_link,
};
use super::{ControllerContext, ReconcileAction};
use crate::capabilities::CapabilitySnapshot;
use crate::crd::openshift::Route;
use crate::crd::{Hawtio, HawtioPhase, HawtioStatus};
use crate::error::{OperatorError, OperatorResult};
use crate::resources::RouteTls;
use crate::store::{ObjectKey, ObjectStore, from_dynamic, get_typed, to_dynamic};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use kube::core::DynamicObject;
use kube::runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;

/// Finalizer holding a Hawtio until its cluster scoped ConsoleLink is removed.
pub const FINALIZER: &str = "hawt.io/finalizer";

const CERT_KEY: &str = "tls.crt";
const PRIVATE_KEY: &str = "tls.key";

/// Controller for Hawtio resources.
#[derive(Clone)]
pub struct HawtioController {
    ctx: Arc<ControllerContext>,
}

impl HawtioController {
    /// Create a new Hawtio controller.
    pub fn new(ctx: Arc<ControllerContext>) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &dyn ObjectStore {
        self.ctx.store.as_ref()
    }

    /// Reconcile a Hawtio resource.
    ///
    /// 1. On OpenShift the Hawtio gets a finalizer guarding its ConsoleLink
    /// 2. A Hawtio never reconciled before is marked `Initialized`, nothing else
    /// 3. Capabilities are resolved and the children planned
    /// 4. Children are created, or updated when they drifted from the desired state
    /// 5. The routing kind not in use is removed
    /// 6. The ConsoleLink follows the routing URL
    /// 7. The status is recomputed and written when it changed
    ///
    /// A non-transient failure is recorded as `Failed` before the error is
    /// returned. Transient failures write nothing.
    pub async fn reconcile(&self, hawtio: Arc<Hawtio>) -> OperatorResult<ReconcileAction> {
        let name = hawtio.name_any();
        let namespace = hawtio
            .namespace()
            .ok_or_else(|| OperatorError::InvalidConfig("Hawtio must be namespaced".into()))?;

        if hawtio.metadata.deletion_timestamp.is_some() {
            // Namespaced children are garbage collected through their owner references.
            tracing::debug!(name = %name, namespace = %namespace, "Hawtio is being deleted");
            return self.finalize(&hawtio).await;
        }

        let mut hawtio = hawtio;
        match self.reconcile_live(&mut hawtio).await {
            Ok(action) => Ok(action),
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                tracing::error!(name = %name, namespace = %namespace, error = %e, "Hawtio failed");
                let failed = HawtioStatus {
                    phase: Some(HawtioPhase::Failed),
                    ..Default::default()
                };
                if let Err(write_err) = self.write_status(&hawtio, failed).await {
                    tracing::warn!(
                        name = %name,
                        error = %write_err,
                        "Could not record Failed phase"
                    );
                }
                Err(e)
            }
        }
    }

    // `hawtio` is replaced by the stored object whenever this pass writes it.
    async fn reconcile_live(&self, hawtio: &mut Arc<Hawtio>) -> OperatorResult<ReconcileAction> {
        let caps = self.ctx.capabilities.get_or_detect(self.store()).await?;
        if caps.is_extended_platform && !has_finalizer(hawtio) {
            *hawtio = Arc::new(self.add_finalizer(hawtio).await?);
        }

        let phase = hawtio.status.as_ref().and_then(|s| s.phase.as_ref());
        if phase.is_none() {
            tracing::info!(name = %hawtio.name_any(), "Initializing Hawtio");
            self.write_status(
                hawtio,
                HawtioStatus {
                    phase: Some(HawtioPhase::Initialized),
                    ..Default::default()
                },
            )
            .await?;
            return Ok(ReconcileAction::requeue_short());
        }

        tracing::info!(
            name = %hawtio.name_any(),
            namespace = ?hawtio.namespace(),
            phase = ?phase,
            "Reconciling Hawtio"
        );
        self.converge(hawtio, &caps).await
    }

    async fn converge(
        &self,
        hawtio: &Hawtio,
        caps: &CapabilitySnapshot,
    ) -> OperatorResult<ReconcileAction> {
        let name = hawtio.name_any();
        let namespace = hawtio.namespace().unwrap_or_default();

        let route_tls = if caps.routes_available {
            self.read_route_tls(hawtio, &namespace).await?
        } else {
            RouteTls::default()
        };

        let plan = plan_children(hawtio, caps, &self.ctx.config, &route_tls)?;
        tracing::debug!(
            name = %name,
            routing = ?plan.routing,
            scope = ?plan.scope,
            "Planned children"
        );

        for desired in &plan.apply {
            self.apply(desired).await?;
        }
        self.prune(hawtio, &plan).await?;

        let status = self.observe(hawtio, &plan).await?;
        if caps.is_extended_platform {
            match plan_console_link(hawtio, caps, &plan, status.url.as_deref())? {
                Some(link) => self.apply(&link).await?,
                None => self.remove_console_link(hawtio).await?,
            }
        }

        let deployed = status.phase == Some(HawtioPhase::Deployed);
        self.write_status(hawtio, status).await?;

        if deployed {
            Ok(ReconcileAction::requeue_long())
        } else {
            Ok(ReconcileAction::requeue_short())
        }
    }

    /// Release a Hawtio being deleted: remove its ConsoleLink, then the finalizer.
    async fn finalize(&self, hawtio: &Hawtio) -> OperatorResult<ReconcileAction> {
        if !has_finalizer(hawtio) {
            return Ok(ReconcileAction::Done);
        }

        self.remove_console_link(hawtio).await?;

        let mut obj = to_dynamic(hawtio)?;
        obj.finalizers_mut().retain(|f| f != FINALIZER);
        self.store().update(&obj).await?;
        tracing::info!(name = %hawtio.name_any(), "Released Hawtio finalizer");
        Ok(ReconcileAction::Done)
    }

    async fn add_finalizer(&self, hawtio: &Hawtio) -> OperatorResult<Hawtio> {
        let mut obj = to_dynamic(hawtio)?;
        obj.finalizers_mut().push(FINALIZER.to_string());
        let updated = self.store().update(&obj).await?;
        tracing::debug!(name = %hawtio.name_any(), "Added Hawtio finalizer");
        from_dynamic(updated)
    }

    async fn remove_console_link(&self, hawtio: &Hawtio) -> OperatorResult<()> {
        let key = console_link_key(hawtio);
        let Some(live) = self.store().get(&key).await? else {
            return Ok(());
        };
        if owns_console_link(hawtio, &live) {
            tracing::info!(child = %key, "Removing console link");
            self.store().delete(&key).await?;
        } else {
            tracing::warn!(child = %key, "Leaving console link not created for this Hawtio");
        }
        Ok(())
    }

    /// Create `desired`, or replace the live object when it has drifted from it.
    async fn apply(&self, desired: &DynamicObject) -> OperatorResult<()> {
        let key = ObjectKey::from_dynamic(desired)?;

        let Some(live) = self.store().get(&key).await? else {
            tracing::info!(child = %key, "Creating child");
            self.store().create(desired).await?;
            return Ok(());
        };

        if in_sync(&live, desired) {
            tracing::debug!(child = %key, "Child up to date");
            return Ok(());
        }

        tracing::info!(child = %key, "Updating child");
        let mut updated = desired.clone();
        updated.metadata.resource_version = live.metadata.resource_version.clone();
        if key.kind == "Service" {
            preserve_cluster_ip(&live, &mut updated);
        }
        self.store().update(&updated).await?;
        Ok(())
    }

    /// Delete children of the routing kind not in use, when this Hawtio owns them.
    async fn prune(&self, hawtio: &Hawtio, plan: &ChildPlan) -> OperatorResult<()> {
        let uid = hawtio.uid();
        for key in &plan.prune {
            let Some(live) = self.store().get(key).await? else {
                continue;
            };
            let owned = live
                .owner_references()
                .iter()
                .any(|o| Some(&o.uid) == uid.as_ref());
            if owned {
                tracing::info!(child = %key, "Removing routing child no longer in use");
                self.store().delete(key).await?;
            } else {
                tracing::warn!(child = %key, "Leaving routing object not owned by this Hawtio");
            }
        }
        Ok(())
    }

    async fn observe(&self, hawtio: &Hawtio, plan: &ChildPlan) -> OperatorResult<HawtioStatus> {
        let name = hawtio.name_any();
        let namespace = hawtio.namespace();
        let ns = namespace.as_deref();

        let deployment = get_typed::<Deployment>(self.store(), ns, &name).await?;
        let url = match plan.routing {
            Routing::Route => {
                let route = get_typed::<Route>(self.store(), ns, &name).await?;
                routing_url(route.as_ref(), None)
            }
            Routing::Ingress => {
                let ingress = get_typed::<Ingress>(self.store(), ns, &name).await?;
                routing_url(None, ingress.as_ref())
            }
        };

        Ok(project_status(&name, &plan.image, deployment.as_ref(), url))
    }

    async fn read_route_tls(&self, hawtio: &Hawtio, namespace: &str) -> OperatorResult<RouteTls> {
        let route = &hawtio.spec.route;
        let mut tls = RouteTls::default();

        if let Some(cert_secret) = &route.cert_secret {
            let secret = self.read_secret(namespace, &cert_secret.name).await?;
            tls.certificate = Some(secret_value(&secret, CERT_KEY)?);
            tls.key = Some(secret_value(&secret, PRIVATE_KEY)?);
        }

        if let Some(ca_cert) = &route.ca_cert {
            let secret = self.read_secret(namespace, &ca_cert.name).await?;
            tls.destination_ca_certificate = Some(secret_value(&secret, &ca_cert.key)?);
        }

        Ok(tls)
    }

    async fn read_secret(&self, namespace: &str, name: &str) -> OperatorResult<Secret> {
        get_typed::<Secret>(self.store(), Some(namespace), name)
            .await?
            .ok_or_else(|| OperatorError::NotFound {
                kind: "Secret".into(),
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }

    /// Write `status` as a unit, guarded by the Hawtio's resourceVersion. Skipped
    /// when the live status already matches.
    async fn write_status(&self, hawtio: &Hawtio, status: HawtioStatus) -> OperatorResult<()> {
        if hawtio.status.as_ref() == Some(&status) {
            tracing::debug!(name = %hawtio.name_any(), "Status unchanged");
            return Ok(());
        }

        let key = ObjectKey::of::<Hawtio>(hawtio.namespace().as_deref(), &hawtio.name_any());
        tracing::info!(
            name = %key.name,
            phase = ?status.phase,
            url = ?status.url,
            "Updating Hawtio status"
        );
        self.store()
            .update_status(
                &key,
                hawtio.resource_version().as_deref(),
                serde_json::to_value(&status)?,
            )
            .await
    }
}

fn has_finalizer(hawtio: &Hawtio) -> bool {
    hawtio.finalizers().iter().any(|f| f == FINALIZER)
}

fn secret_value(secret: &Secret, key: &str) -> OperatorResult<String> {
    let name = secret.name_any();
    if let Some(value) = secret.string_data.as_ref().and_then(|d| d.get(key)) {
        return Ok(value.clone());
    }
    let bytes = secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .ok_or_else(|| {
            OperatorError::InvalidConfig(format!("Secret {name} has no key {key}"))
        })?;
    String::from_utf8(bytes.0.clone())
        .map_err(|_| OperatorError::InvalidConfig(format!("Secret {name} key {key} is not UTF-8")))
}

/// Keep the allocated cluster IPs, which are immutable once set.
fn preserve_cluster_ip(live: &DynamicObject, desired: &mut DynamicObject) {
    for field in ["clusterIP", "clusterIPs"] {
        if let Some(value) = live.data.pointer(&format!("/spec/{field}")) {
            if let Some(spec) = desired.data.get_mut("spec").and_then(|s| s.as_object_mut()) {
                spec.insert(field.to_string(), value.clone());
            }
        }
    }
}

/// Entry point for `kube::runtime::Controller::run`.
///
/// Bounds the reconciliation by the configured deadline. A timed out pass is
/// dropped before its status write, so observers never see a partial status.
pub async fn reconcile(hawtio: Arc<Hawtio>, ctx: Arc<ControllerContext>) -> OperatorResult<Action> {
    let deadline = ctx.config.reconcile_timeout;
    let controller = HawtioController::new(ctx);
    match tokio::time::timeout(deadline, controller.reconcile(hawtio)).await {
        Ok(result) => result.map(Action::from),
        Err(_) => Err(OperatorError::Timeout(deadline)),
    }
}

/// Handle errors during reconciliation.
pub fn error_policy(hawtio: Arc<Hawtio>, error: &OperatorError, _ctx: Arc<ControllerContext>) -> Action {
    let name = hawtio.name_any();
    if error.is_transient() {
        tracing::warn!(name = %name, error = %error, "Reconciliation interrupted, retrying");
        Action::requeue(Duration::from_secs(5))
    } else {
        tracing::error!(name = %name, error = %error, "Reconciliation error");
        Action::requeue(Duration::from_secs(60))
    }
}
