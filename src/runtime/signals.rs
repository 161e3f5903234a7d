//! # Signals
//!
//! SIGINT / SIGTERM handling. The first signal starts a graceful shutdown; a
//! second one exits the process immediately with status 1.

use tracing::{error, info, warn};

/// Resolves on the first shutdown signal
///
/// Arms a handler that force-exits on the next signal.
pub async fn shutdown_signal() {
    wait_for_signal().await;
    info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");

    tokio::spawn(async {
        wait_for_signal().await;
        error!("Received second shutdown signal, exiting immediately");
        std::process::exit(1);
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler, only SIGINT will be handled: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for SIGINT: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
