//! Kubernetes controller for Hawtio resources.
//!
//! - [`HawtioController`]: reconciles a `v1` Hawtio into its children and status
//! - [`derive_phase`]: pure phase recomputation from the observed Deployment
//! - [`plan_children`]: pure desired state from a Hawtio and a capability snapshot
//!
//! # Usage with kube-runtime
//!
//! ```ignore
//! use hawtio_operator::controller::{ControllerContext, error_policy, reconcile};
//!
//! Controller::new(hawtios, watcher_config)
//!     .run(reconcile, error_policy, context)
//!     .for_each(|_| futures::future::ready(()))
//!     .await;
//! ```

mod hawtio;
mod phase;
mod plan;

pub use hawtio::{FINALIZER, HawtioController, error_policy, reconcile};
pub use phase::{derive_phase, project_status, routing_url};
pub use plan::{
    ChildPlan, Routing, console_link_key, plan_children, plan_console_link, resolve_scope,
};

use crate::capabilities::CapabilityCache;
use crate::config::OperatorConfig;
use crate::store::ObjectStore;
use std::sync::Arc;

/// Shared context for the controller.
pub struct ControllerContext {
    /// Object store the controller reads and writes through.
    pub store: Arc<dyn ObjectStore>,
    /// Capability snapshot cache shared by every reconciliation.
    pub capabilities: CapabilityCache,
    /// Operator configuration.
    pub config: OperatorConfig,
}

impl ControllerContext {
    /// Create a new controller context.
    pub fn new(store: Arc<dyn ObjectStore>, config: OperatorConfig) -> Self {
        Self {
            store,
            capabilities: CapabilityCache::new(config.capability_ttl),
            config,
        }
    }
}

/// Result type for reconciliation actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Requeue after the specified duration.
    Requeue(std::time::Duration),
    /// Don't requeue (reconciliation complete).
    Done,
}

impl ReconcileAction {
    /// Requeue after 5 seconds (children still converging).
    pub fn requeue_short() -> Self {
        Self::Requeue(std::time::Duration::from_secs(5))
    }

    /// Requeue after 5 minutes (periodic resync of a deployed console).
    pub fn requeue_long() -> Self {
        Self::Requeue(std::time::Duration::from_secs(300))
    }
}

impl From<ReconcileAction> for kube::runtime::controller::Action {
    fn from(action: ReconcileAction) -> Self {
        match action {
            ReconcileAction::Requeue(duration) => Self::requeue(duration),
            ReconcileAction::Done => Self::await_change(),
        }
    }
}
