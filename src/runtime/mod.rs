//! # Runtime
//!
//! Process-level wiring of the controller.
//!
//! - `initialization`: tracing, metrics, probe server, client and component setup
//! - `watch_loop`: cache sync barrier, worker pool, graceful shutdown
//! - `workers`: the per-key processing loop with panic recovery
//! - `error_policy`: forget vs. rate-limited retry
//! - `signals`: SIGINT / SIGTERM handling

pub mod error_policy;
pub mod initialization;
pub mod signals;
pub mod watch_loop;
pub mod workers;

use crate::cli::Args;
use anyhow::Result;
use tracing::info;
use watch_loop::{run_controller, ControllerHandles};

/// Run the controller until a shutdown signal arrives
///
/// # Errors
///
/// Returns an error if initialization fails or a watch dies before its cache synced.
pub async fn run(args: Args) -> Result<()> {
    let init = initialization::initialize(&args).await?;

    let robot_informer = tokio::spawn(init.robot_informer.run());
    let deployment_informer = tokio::spawn(init.deployment_informer.run());
    let router = tokio::spawn(init.router.run(init.robot_events, init.deployment_events));

    let result = run_controller(
        ControllerHandles {
            robots: init.robots,
            deployments: init.deployments,
            queue: init.queue,
            reconciler: init.reconciler,
            server_state: init.server_state,
            workers: init.config.workers,
        },
        signals::shutdown_signal(),
    )
    .await;

    router.abort();
    robot_informer.abort();
    deployment_informer.abort();
    info!("Robot Operator stopped");
    result
}
