//! # Robot Operator
//!
//! Watches `Robot` resources in all namespaces and keeps the Deployment each
//! one names in sync with it.
//!
//! ## Usage
//!
//! ```bash
//! robot-operator --kubeconfig ~/.kube/config
//! ```
//!
//! Settings beyond the flags come from the environment (`WORKERS`,
//! `METRICS_PORT`, `QUEUE_*`, `RUST_LOG`).

use anyhow::Result;
use clap::Parser;
use robot_operator::cli::Args;
use robot_operator::runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    runtime::initialization::init_tracing();
    runtime::run(args).await
}
