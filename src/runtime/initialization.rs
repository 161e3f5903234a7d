//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, the probe
//! server, the Kubernetes client, and the informer / queue / reconciler wiring.

use crate::cli::Args;
use crate::config::controller::env_var_or_default_str;
use crate::config::ControllerConfig;
use crate::constants::CONTROLLER_NAME;
use crate::controller::backoff::controller_rate_limiter;
use crate::controller::informer::{Informer, ResourceEvent};
use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::Reconciler;
use crate::controller::router::EventRouter;
use crate::controller::server::{start_server, ServerState};
use crate::crd::Robot;
use crate::events::KubeEventPublisher;
use crate::observability;
use crate::store::{Cache, KubeWriter};
use anyhow::{Context, Result};
use k8s_openapi::api::apps::v1::Deployment;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Initialization result containing all components of the controller
pub struct InitializationResult {
    pub config: ControllerConfig,
    pub server_state: Arc<ServerState>,
    pub robot_informer: Informer<Robot>,
    pub deployment_informer: Informer<Deployment>,
    pub robot_events: mpsc::Receiver<ResourceEvent<Robot>>,
    pub deployment_events: mpsc::Receiver<ResourceEvent<Deployment>>,
    pub robots: Cache<Robot>,
    pub deployments: Cache<Deployment>,
    pub queue: WorkQueue<String>,
    pub router: EventRouter,
    pub reconciler: Arc<Reconciler>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Install the rustls crypto provider and the tracing subscriber
///
/// Call once, before anything logs or opens a TLS connection.
pub fn init_tracing() {
    // Required for rustls 0.23+ when no default provider is set via features
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "robot_operator=info".into()),
        )
        .init();

    if !provider_installed {
        warn!("rustls crypto provider was already installed");
    }
}

/// Build a client from `--kubeconfig` / `--master`, falling back to inference
///
/// # Errors
///
/// Returns an error if the kubeconfig cannot be loaded, the master URL does
/// not parse, or the client cannot be constructed.
pub async fn build_client(args: &Args) -> Result<Client> {
    let mut config = match &args.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .with_context(|| format!("Failed to load kubeconfig {}", path.display()))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    if let Some(master) = &args.master {
        config.cluster_url = master
            .parse()
            .with_context(|| format!("Invalid --master URL {master:?}"))?;
    }
    info!("Using Kubernetes API server {}", config.cluster_url);

    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Initialize the controller runtime
///
/// This function handles:
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Informers for Robots and Deployments
/// - Work queue, event router and reconciler setup
///
/// # Errors
///
/// Returns an error if metrics cannot be registered or the client cannot be built.
pub async fn initialize(args: &Args) -> Result<InitializationResult> {
    info!("Starting Robot Operator v{}", env!("CARGO_PKG_VERSION"));

    let config = ControllerConfig::from_env();
    info!("Configuration: {:?}", config);

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = build_client(args).await?;

    // Watch all namespaces
    let (robot_informer, robots, robot_events) =
        Informer::new(Api::<Robot>::all(client.clone()), config.event_channel_capacity);
    let (deployment_informer, deployments, deployment_events) = Informer::new(
        Api::<Deployment>::all(client.clone()),
        config.event_channel_capacity,
    );

    let queue = WorkQueue::new(
        "robots",
        controller_rate_limiter(
            config.queue_base_delay(),
            config.queue_max_delay(),
            config.queue_qps,
            config.queue_burst,
        ),
    );
    let router = EventRouter::new(robots.clone(), queue.clone());

    let instance = Some(env_var_or_default_str("POD_NAME", CONTROLLER_NAME));
    let reconciler = Arc::new(Reconciler::new(
        robots.clone(),
        deployments.clone(),
        Arc::new(KubeWriter::new(client.clone())),
        Arc::new(KubeEventPublisher::new(client, CONTROLLER_NAME, instance)),
    ));

    info!("Controller initialized, starting informers...");

    Ok(InitializationResult {
        config,
        server_state,
        robot_informer,
        deployment_informer,
        robot_events,
        deployment_events,
        robots,
        deployments,
        queue,
        router,
        reconciler,
    })
}
