//! # Workers
//!
//! Reconcile workers pulling keys from the shared work queue.

use super::error_policy::{handle_reconcile_result, KeyOutcome};
use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::{ReconcileError, Reconciler};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

/// Take one key off the queue, reconcile it and apply the error policy
///
/// A panicking reconcile is turned into a retryable error. The key is always
/// marked done. Returns `None` once the queue has shut down.
pub async fn process_next_work_item(
    queue: &WorkQueue<String>,
    reconciler: &Reconciler,
) -> Option<KeyOutcome> {
    let key = queue.get().await?;

    let result = match AssertUnwindSafe(reconciler.reconcile(&key))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Reconcile of '{}' panicked: {}", key, message);
            Err(ReconcileError::Panicked(message))
        }
    };

    let outcome = handle_reconcile_result(queue, &key, &result);
    queue.done(&key);
    Some(outcome)
}

/// Process keys until the queue shuts down
pub async fn run_worker(id: usize, queue: WorkQueue<String>, reconciler: Arc<Reconciler>) {
    debug!("Worker {} started", id);
    while process_next_work_item(&queue, &reconciler).await.is_some() {}
    debug!("Worker {} stopped", id);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
