//! Hawtio Kubernetes Operator binary.
//!
//! This binary runs the Hawtio operator, which manages Hawtio custom resources
//! in a Kubernetes or OpenShift cluster.

use clap::Parser;
use futures::StreamExt;
use hawtio_operator::config::OperatorConfig;
use hawtio_operator::controller::{ControllerContext, error_policy, reconcile};
use hawtio_operator::crd::{ConversionWebhookService, Hawtio, generate_crd};
use hawtio_operator::store::KubeStore;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::Controller;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client};
use std::sync::Arc;

/// Hawtio Kubernetes Operator
#[derive(Debug, Parser)]
#[command(name = "hawtio-operator", version, about)]
struct Args {
    /// Print the Hawtio CRD as YAML and exit
    #[arg(long)]
    generate_crds: bool,

    /// Service of the conversion webhook, rendered into the generated CRD
    #[arg(long, env = "HAWTIO_WEBHOOK_SERVICE")]
    webhook_service: Option<String>,

    /// Namespace of the conversion webhook service
    #[arg(long, env = "HAWTIO_WEBHOOK_NAMESPACE", default_value = "hawtio-system")]
    webhook_namespace: String,

    /// Port of the conversion webhook service
    #[arg(long, env = "HAWTIO_WEBHOOK_PORT", default_value_t = 443)]
    webhook_port: i32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.generate_crds {
        return generate_crds(&args);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hawtio_operator=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .init();

    tracing::info!("Starting Hawtio Kubernetes Operator");

    let config = OperatorConfig::from_env()?;
    tracing::info!(
        image = %config.image(),
        capability_ttl = ?config.capability_ttl,
        reconcile_timeout = ?config.reconcile_timeout,
        "Configuration loaded"
    );

    let client = Client::try_default().await?;
    tracing::info!("Connected to Kubernetes cluster");

    let store = Arc::new(KubeStore::new(client.clone(), config.field_manager.clone()));
    let ctx = Arc::new(ControllerContext::new(store, config));

    run_controller(client, ctx).await
}

/// Run the Hawtio controller until a shutdown signal arrives.
///
/// Routes are not watched: their kind may not exist on the cluster. Route
/// changes are picked up by the periodic requeue.
async fn run_controller(client: Client, ctx: Arc<ControllerContext>) -> anyhow::Result<()> {
    tracing::info!("Starting Hawtio controller");

    let hawtios: Api<Hawtio> = Api::all(client.clone());
    let watcher_config = WatcherConfig::default();

    Controller::new(hawtios, watcher_config.clone())
        .owns(Api::<Deployment>::all(client.clone()), watcher_config.clone())
        .owns(Api::<Service>::all(client.clone()), watcher_config.clone())
        .owns(Api::<ConfigMap>::all(client.clone()), watcher_config.clone())
        .owns(Api::<Ingress>::all(client), watcher_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    tracing::debug!(
                        hawtio = %obj.name,
                        namespace = ?obj.namespace,
                        ?action,
                        "Reconciled Hawtio"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Hawtio controller stream error");
                }
            }
        })
        .await;

    tracing::info!("Hawtio controller stopped");
    Ok(())
}

/// Generate CRD YAML.
fn generate_crds(args: &Args) -> anyhow::Result<()> {
    let webhook = args
        .webhook_service
        .as_ref()
        .map(|name| ConversionWebhookService {
            name: name.clone(),
            namespace: args.webhook_namespace.clone(),
            port: args.webhook_port,
        });

    println!("---");
    println!("{}", serde_yaml::to_string(&generate_crd(webhook.as_ref())?)?);
    Ok(())
}
