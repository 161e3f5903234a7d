//! # Controller
//!
//! Core controller modules for the Robot Operator.
//!
//! - `backoff`: retry delays (per-item exponential plus overall token bucket)
//! - `informer`: watch streams into caches and typed events
//! - `queue`: deduplicating, rate-limited work queue
//! - `reconciler`: core reconciliation logic
//! - `router`: maps watch events to reconcile keys
//! - `server`: HTTP server for metrics and health checks
//!
//! The `crdgen` binary lives alongside these modules but is not part of the library.

pub mod backoff;
pub mod informer;
pub mod queue;
pub mod reconciler;
pub mod router;
pub mod server;
