//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Number of parallel reconcile workers
    pub workers: usize,
    /// Port for the metrics and probe server
    pub metrics_port: u16,
    /// Per-item backoff starting value (milliseconds)
    pub queue_base_delay_ms: u64,
    /// Per-item backoff ceiling (seconds)
    pub queue_max_delay_secs: u64,
    /// Overall queue admission rate (items per second)
    pub queue_qps: f64,
    /// Overall queue burst size
    pub queue_burst: u32,
    /// Capacity of each watch event channel
    pub event_channel_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            workers: DEFAULT_WORKERS,
            metrics_port: DEFAULT_METRICS_PORT,
            queue_base_delay_ms: DEFAULT_QUEUE_BASE_DELAY_MS,
            queue_max_delay_secs: DEFAULT_QUEUE_MAX_DELAY_SECS,
            queue_qps: DEFAULT_QUEUE_QPS,
            queue_burst: DEFAULT_QUEUE_BURST,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// Zero workers or a zero channel capacity would stall the controller, so
    /// both are raised to one.
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            workers: env_var_or_default("WORKERS", DEFAULT_WORKERS).max(1),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            queue_base_delay_ms: env_var_or_default(
                "QUEUE_BASE_DELAY_MS",
                DEFAULT_QUEUE_BASE_DELAY_MS,
            ),
            queue_max_delay_secs: env_var_or_default(
                "QUEUE_MAX_DELAY_SECS",
                DEFAULT_QUEUE_MAX_DELAY_SECS,
            ),
            queue_qps: env_var_or_default("QUEUE_QPS", DEFAULT_QUEUE_QPS),
            queue_burst: env_var_or_default("QUEUE_BURST", DEFAULT_QUEUE_BURST),
            event_channel_capacity: env_var_or_default(
                "EVENT_CHANNEL_CAPACITY",
                DEFAULT_EVENT_CHANNEL_CAPACITY,
            )
            .max(1),
        }
    }

    /// Per-item backoff starting value
    pub fn queue_base_delay(&self) -> Duration {
        Duration::from_millis(self.queue_base_delay_ms)
    }

    /// Per-item backoff ceiling
    pub fn queue_max_delay(&self) -> Duration {
        Duration::from_secs(self.queue_max_delay_secs)
    }
}

/// Read environment variable or return default
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
