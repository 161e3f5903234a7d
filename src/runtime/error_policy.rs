//! # Error Policy
//!
//! The one place that decides what happens to a key after a reconcile:
//! forget it, or put it back with the rate limiter's delay.

use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::{ReconcileError, ReconcileOutcome};
use crate::observability;
use tracing::{debug, error, info};

/// Where a key ended up after one reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Reconciled; failure history cleared
    Succeeded,
    /// Failed with a retryable error; re-queued with backoff
    Retrying,
    /// Failed with an error retrying cannot fix; failure history cleared
    Dropped,
}

/// Apply the retry policy to a finished reconcile
///
/// Must be called before `done` so a retry is registered while the key is
/// still marked as processing.
pub fn handle_reconcile_result(
    queue: &WorkQueue<String>,
    key: &str,
    result: &Result<ReconcileOutcome, ReconcileError>,
) -> KeyOutcome {
    let item = key.to_string();

    let error = match result {
        Ok(outcome) => {
            queue.forget(&item);
            debug!("Successfully synced '{}' ({})", key, outcome.as_str());
            return KeyOutcome::Succeeded;
        }
        Err(error) => error,
    };

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconcile.error",
        resource.key = key,
        error.classification = error.classification(),
        error = %error
    );
    let _error_guard = error_span.enter();

    observability::metrics::increment_reconciliation_errors(error.classification());

    if !error.is_retryable() {
        queue.forget(&item);
        error!("Dropping '{}' from the work queue: {}", key, error);
        return KeyOutcome::Dropped;
    }

    let attempt = queue.num_requeues(&item) + 1;
    let delay = queue.add_rate_limited(item);
    let next_retry = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());

    error!("Error syncing '{}': {}", key, error);
    info!(
        "🔄 Retry {} for '{}' scheduled at {} (in {:?})",
        attempt,
        key,
        next_retry.to_rfc3339(),
        delay
    );
    KeyOutcome::Retrying
}
