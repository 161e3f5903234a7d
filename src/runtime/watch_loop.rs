//! # Watch Loop
//!
//! Starts the reconcile workers once both caches have synced and stops them on
//! shutdown.

use super::workers::run_worker;
use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::ServerState;
use crate::crd::Robot;
use crate::store::Cache;
use anyhow::{Context, Result};
use k8s_openapi::api::apps::v1::Deployment;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Everything the worker pool needs
#[derive(Debug)]
pub struct ControllerHandles {
    pub robots: Cache<Robot>,
    pub deployments: Cache<Deployment>,
    pub queue: WorkQueue<String>,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
    pub workers: usize,
}

/// Run the worker pool until `shutdown` resolves
///
/// Workers start only after both caches have completed their initial list.
/// On shutdown the queue is drained of in-flight work and every worker is
/// joined before returning.
///
/// # Errors
///
/// Returns an error if a watch feeding one of the caches stops before the
/// cache synced.
pub async fn run_controller<S>(handles: ControllerHandles, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    let ControllerHandles {
        robots,
        deployments,
        queue,
        reconciler,
        server_state,
        workers,
    } = handles;
    tokio::pin!(shutdown);

    info!("Waiting for informer caches to sync");
    tokio::select! {
        synced = wait_for_caches(&robots, &deployments) => synced?,
        () = &mut shutdown => {
            info!("Shutdown requested before caches synced");
            queue.shut_down();
            return Ok(());
        }
    }
    info!("Caches synced");

    server_state.set_ready(true);
    info!("Starting {} workers", workers);
    let worker_tasks: Vec<_> = (0..workers)
        .map(|id| tokio::spawn(run_worker(id, queue.clone(), Arc::clone(&reconciler))))
        .collect();

    shutdown.await;

    server_state.set_ready(false);
    info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    queue.shut_down();
    for handle in worker_tasks {
        if let Err(e) = handle.await {
            error!("Worker task failed: {}", e);
        }
    }
    info!("All workers stopped");
    Ok(())
}

async fn wait_for_caches(robots: &Cache<Robot>, deployments: &Cache<Deployment>) -> Result<()> {
    robots
        .wait_until_ready()
        .await
        .context("Robot watch stopped before its cache synced")?;
    deployments
        .wait_until_ready()
        .await
        .context("Deployment watch stopped before its cache synced")?;
    Ok(())
}
