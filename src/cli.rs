//! # Command Line
//!
//! Flags accepted by the `robot-operator` binary.
//!
//! ```bash
//! # In-cluster, or whatever the default kubeconfig resolves to
//! robot-operator
//!
//! # Explicit kubeconfig and API server
//! robot-operator --kubeconfig ~/.kube/config --master https://127.0.0.1:6443
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Keeps Deployments in sync with Robot resources
#[derive(Debug, Clone, Parser)]
#[command(name = "robot-operator", version, about, long_about = None)]
pub struct Args {
    /// Path to a kubeconfig. Only required if out-of-cluster.
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// The address of the Kubernetes API server. Overrides any value in kubeconfig.
    #[arg(long, value_name = "URL")]
    pub master: Option<String>,
}
