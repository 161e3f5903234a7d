//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Name used as the event reporter and field manager
pub const CONTROLLER_NAME: &str = "robot-operator";

/// Kind of the custom resource that owns Deployments
pub const ROBOT_KIND: &str = "Robot";

/// Default number of parallel reconcile workers
pub const DEFAULT_WORKERS: usize = 2;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default per-item backoff starting value (milliseconds)
pub const DEFAULT_QUEUE_BASE_DELAY_MS: u64 = 5;

/// Default per-item backoff ceiling (seconds)
pub const DEFAULT_QUEUE_MAX_DELAY_SECS: u64 = 1000;

/// Default overall queue admission rate (items per second)
pub const DEFAULT_QUEUE_QPS: f64 = 10.0;

/// Default overall queue burst size
pub const DEFAULT_QUEUE_BURST: u32 = 100;

/// Default capacity of each watch event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Label key carrying the owning Robot name on generated Deployments
pub const CONTROLLER_LABEL: &str = "controller";

/// Application label value on generated Deployments and their pods
pub const APP_LABEL_VALUE: &str = "nginx";

/// Container name and image used in generated pod templates
pub const WORKLOAD_CONTAINER_NAME: &str = "nginx";
pub const WORKLOAD_CONTAINER_IMAGE: &str = "nginx:latest";

/// Event reasons
pub const REASON_SYNCED: &str = "Synced";
pub const REASON_RESOURCE_EXISTS: &str = "ErrResourceExists";
pub const REASON_INVALID_SPEC: &str = "InvalidSpec";

/// Event message published after a successful sync
pub const MESSAGE_RESOURCE_SYNCED: &str = "Robot synced successfully";
