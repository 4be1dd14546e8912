//! Hawtio Kubernetes Operator
//!
//! This crate provides a Kubernetes operator for deploying and managing the
//! Hawtio web console.
//!
//! # Custom Resource Definitions
//!
//! - **Hawtio `v1`**: the stored revision, reconciled into a Deployment, Service,
//!   ConfigMap and a Route (OpenShift) or Ingress (Kubernetes), plus a web
//!   console ConsoleLink on OpenShift
//! - **Hawtio `v1alpha1`**: deprecated, converted to `v1` by the conversion webhook
//!
//! # Example
//!
//! ```yaml
//! apiVersion: hawt.io/v1
//! kind: Hawtio
//! metadata:
//!   name: hawtio-online
//! spec:
//!   type: Namespace
//!   replicas: 1
//!   metadataPropagation:
//!     labels: ["team"]
//!     annotations: ["example.com/*"]
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capabilities;
pub mod config;
pub mod controller;
pub mod conversion;
pub mod crd;
pub mod error;
pub mod resources;
pub mod store;
pub mod webhook;

pub use capabilities::{CapabilityCache, CapabilitySnapshot};
pub use config::OperatorConfig;
pub use crd::{Hawtio, HawtioPhase, HawtioSpec, HawtioStatus};
pub use error::{OperatorError, OperatorResult};
pub use store::{KubeStore, ObjectKey, ObjectStore};
