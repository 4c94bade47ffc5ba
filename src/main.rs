// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    runtime::{
        controller::Action,
        reflector::{self, ObjectRef, Store},
        watcher::{self, Config},
        Controller, WatchStreamExt,
    },
    Api, Client, ResourceExt,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use upgrade_readiness::{
    constants::{
        ERROR_REQUEUE_DURATION_SECS, READY_REQUEUE_DURATION_SECS, SKIP_REQUEUE_DURATION_SECS,
        SYSTEM_NAMESPACE,
    },
    context::{Context, ContextOptions, Stores},
    crd::{App, Plan, ProvisioningCluster, RKEControlPlane},
    metrics,
    reconcilers::{reconcile_control_plane, reconcile_system_agent_bundle, DeliveryOutcome},
    settings::Settings,
};

const KIND_CONTROL_PLANE: &str = "RKEControlPlane";
const KIND_CLUSTER: &str = "Cluster";

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] upgrade_readiness::errors::ReconcileError);

/// Upgrade-readiness reconciler for system-agent and system-upgrade-controller
#[derive(Parser, Debug)]
#[command(name = "upgrade-readiness", version, about, long_about = None)]
struct Cli {
    /// Name of the management cluster this process serves
    #[arg(long, env = "MANAGEMENT_CLUSTER_NAME")]
    management_cluster_name: String,

    /// Kubeconfig of the downstream cluster; defaults to the in-cluster client
    #[arg(long, env = "DOWNSTREAM_KUBECONFIG")]
    downstream_kubeconfig: Option<PathBuf>,

    /// Maximum number of system-agent upgrader bundles applied concurrently
    #[arg(long, env = "DELIVERY_CONCURRENCY", default_value_t = 5)]
    delivery_concurrency: usize,

    /// Address the metrics and health endpoints listen on
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    metrics_bind_address: String,

    #[command(flatten)]
    settings: Settings,
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("upgrade-readiness")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT (json or text)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let cli = Cli::parse();

    info!(
        management_cluster = %cli.management_cluster_name,
        "Starting upgrade-readiness controller"
    );

    debug!("Initializing Kubernetes clients");
    let client = Client::try_default().await?;
    let downstream = downstream_client(cli.downstream_kubeconfig.as_deref(), &client).await?;
    debug!("Kubernetes clients initialized successfully");

    let (cluster_store, cluster_writer) = reflector::store::<ProvisioningCluster>();
    let stores = Stores {
        provisioning_clusters: cluster_store,
    };

    let context = Arc::new(Context::new(
        client.clone(),
        downstream.clone(),
        stores,
        ContextOptions {
            management_cluster_name: cli.management_cluster_name,
            delivery_concurrency: cli.delivery_concurrency,
            settings: cli.settings,
        },
    ));

    info!("Starting all controllers");

    // Controllers should never exit - if one does, log it and exit the main process
    tokio::select! {
        result = run_cluster_reflector(client.clone(), cluster_writer) => {
            error!("CRITICAL: Cluster reflector exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Cluster reflector exited unexpectedly without error")
        }
        result = run_control_plane_controller(context.clone(), downstream) => {
            error!("CRITICAL: RKEControlPlane controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("RKEControlPlane controller exited unexpectedly without error")
        }
        result = run_bundle_delivery_controller(context.clone()) => {
            error!("CRITICAL: Cluster controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Cluster controller exited unexpectedly without error")
        }
        result = run_metrics_server(cli.metrics_bind_address) => {
            error!("CRITICAL: Metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping controllers");
            Ok(())
        }
    }
}

/// Client for the downstream cluster, or the management client when no kubeconfig is given.
async fn downstream_client(kubeconfig: Option<&Path>, management: &Client) -> Result<Client> {
    let Some(path) = kubeconfig else {
        return Ok(management.clone());
    };
    info!(path = %path.display(), "Loading downstream kubeconfig");
    let kubeconfig = Kubeconfig::read_from(path)?;
    let config =
        kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    Ok(Client::try_from(config)?)
}

/// Keep the provisioning cluster store in sync
async fn run_cluster_reflector(
    client: Client,
    writer: reflector::store::Writer<ProvisioningCluster>,
) -> Result<()> {
    info!("Starting provisioning cluster reflector");

    let api = Api::<ProvisioningCluster>::all(client);
    reflector::reflector(writer, watcher::watcher(api, Config::default()))
        .default_backoff()
        .touched_objects()
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Control planes of the served management cluster, as reconcile requests
fn served_control_planes(
    store: &Store<RKEControlPlane>,
    management_cluster_name: &str,
) -> Vec<ObjectRef<RKEControlPlane>> {
    store
        .state()
        .iter()
        .filter(|cp| cp.spec.management_cluster_name == management_cluster_name)
        .map(|cp| ObjectRef::from_obj(cp.as_ref()))
        .collect()
}

/// Run the `RKEControlPlane` condition controller
///
/// Release and plan changes in the downstream cluster requeue every control
/// plane of the served management cluster.
async fn run_control_plane_controller(context: Arc<Context>, downstream: Client) -> Result<()> {
    info!("Starting RKEControlPlane controller");

    // Cluster resolution reads the reflector store; an empty store would look ambiguous
    context.stores.provisioning_clusters.wait_until_ready().await?;

    let api = Api::<RKEControlPlane>::all(context.client.clone());
    let apps = Api::<App>::namespaced(downstream.clone(), SYSTEM_NAMESPACE);
    let plans = Api::<Plan>::namespaced(downstream, SYSTEM_NAMESPACE);

    let controller = Controller::new(api, Config::default());
    let app_store = controller.store();
    let plan_store = controller.store();
    let app_cluster = context.conditions.management_cluster_name.clone();
    let plan_cluster = context.conditions.management_cluster_name.clone();

    controller
        .watches(apps, Config::default(), move |_app| {
            served_control_planes(&app_store, &app_cluster)
        })
        .watches(plans, Config::default(), move |_plan| {
            served_control_planes(&plan_store, &plan_cluster)
        })
        .run(reconcile_control_plane_wrapper, error_policy, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `RKEControlPlane`
async fn reconcile_control_plane_wrapper(
    control_plane: Arc<RKEControlPlane>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();

    match reconcile_control_plane(&ctx.conditions, ctx.control_planes.as_ref(), &control_plane)
        .await
    {
        Ok(patched) => {
            debug!(
                namespace = ?control_plane.namespace(),
                name = %control_plane.name_any(),
                patched,
                "Reconciled RKEControlPlane"
            );
            metrics::record_reconciliation_success(KIND_CONTROL_PLANE, start.elapsed());
            Ok(Action::requeue(Duration::from_secs(READY_REQUEUE_DURATION_SECS)))
        }
        Err(e) if e.is_conflict() => {
            info!(
                namespace = ?control_plane.namespace(),
                name = %control_plane.name_any(),
                "RKEControlPlane changed while reconciling, retrying on the latest version"
            );
            metrics::record_reconciliation_requeue(KIND_CONTROL_PLANE, "conflict");
            Ok(Action::requeue(Duration::from_secs(SKIP_REQUEUE_DURATION_SECS)))
        }
        Err(e) => {
            error!(
                "Failed to reconcile RKEControlPlane {}: {}",
                control_plane.name_any(),
                e
            );
            metrics::record_reconciliation_error(KIND_CONTROL_PLANE, start.elapsed());
            Err(e.into())
        }
    }
}

/// Run the system-agent upgrader bundle controller
///
/// Control plane changes requeue the provisioning cluster of the same name,
/// so a delivery waiting on the controller condition resumes as soon as it flips.
async fn run_bundle_delivery_controller(context: Arc<Context>) -> Result<()> {
    info!("Starting system-agent bundle controller");

    let api = Api::<ProvisioningCluster>::all(context.client.clone());
    let control_planes = Api::<RKEControlPlane>::all(context.client.clone());

    Controller::new(api, Config::default())
        .watches(control_planes, Config::default(), |cp| {
            cp.namespace()
                .map(|ns| ObjectRef::new(&cp.name_any()).within(&ns))
        })
        .run(reconcile_bundle_wrapper, error_policy, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for provisioning `Cluster`s
async fn reconcile_bundle_wrapper(
    cluster: Arc<ProvisioningCluster>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();

    match reconcile_system_agent_bundle(&ctx.delivery, &cluster).await {
        Ok(DeliveryOutcome::Skipped(reason)) => {
            debug!(
                namespace = ?cluster.namespace(),
                name = %cluster.name_any(),
                reason = %reason,
                "Skipping system-agent bundle delivery"
            );
            metrics::record_reconciliation_requeue(KIND_CLUSTER, "skipped");
            Ok(Action::requeue(Duration::from_secs(SKIP_REQUEUE_DURATION_SECS)))
        }
        Ok(DeliveryOutcome::Busy) => {
            metrics::record_reconciliation_requeue(KIND_CLUSTER, "busy");
            Ok(Action::requeue(Duration::from_secs(SKIP_REQUEUE_DURATION_SECS)))
        }
        Ok(outcome) => {
            debug!(
                namespace = ?cluster.namespace(),
                name = %cluster.name_any(),
                outcome = ?outcome,
                "Reconciled Cluster"
            );
            metrics::record_reconciliation_success(KIND_CLUSTER, start.elapsed());
            Ok(Action::requeue(Duration::from_secs(READY_REQUEUE_DURATION_SECS)))
        }
        Err(e) => {
            error!("Failed to reconcile Cluster {}: {}", cluster.name_any(), e);
            metrics::record_reconciliation_error(KIND_CLUSTER, start.elapsed());
            Err(e.into())
        }
    }
}

/// Error policy for both controllers
fn error_policy(
    _resource: Arc<impl std::fmt::Debug>,
    _err: &ReconcileError,
    _ctx: Arc<Context>,
) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Serve `/metrics` and `/healthz`
async fn run_metrics_server(address: String) -> Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(address = %address, "Serving metrics");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    metrics::gather_metrics().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
