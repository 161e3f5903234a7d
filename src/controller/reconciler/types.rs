//! # Types
//!
//! Core types for the reconciler.

use super::status::StatusReporter;
use crate::crd::Robot;
use crate::events::EventPublisher;
use crate::store::{Cache, InvalidKey, ResourceWriter, StoreError};
use k8s_openapi::api::apps::v1::Deployment;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The queued key is not `namespace/name`
    #[error(transparent)]
    MalformedKey(#[from] InvalidKey),

    /// The Robot cannot be acted on until its spec changes
    #[error("{key}: {reason}")]
    InvalidSpec { key: String, reason: String },

    /// The target Deployment is controlled by something other than this Robot
    #[error("deployment {deployment:?} already exists and is not managed by Robot {robot}")]
    OwnershipConflict { robot: String, deployment: String },

    /// A write to the API server failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The reconcile future panicked
    #[error("reconcile panicked: {0}")]
    Panicked(String),
}

impl ReconcileError {
    /// Whether retrying the key later could succeed without a spec change
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::MalformedKey(_) | ReconcileError::InvalidSpec { .. } => false,
            ReconcileError::OwnershipConflict { .. }
            | ReconcileError::Store(_)
            | ReconcileError::Panicked(_) => true,
        }
    }

    /// Short label used for metrics and logs
    #[must_use]
    pub fn classification(&self) -> &'static str {
        match self {
            ReconcileError::MalformedKey(_) => "malformed-key",
            ReconcileError::InvalidSpec { .. } => "invalid-spec",
            ReconcileError::OwnershipConflict { .. } => "conflict",
            ReconcileError::Store(StoreError::Conflict(_)) => "conflict",
            ReconcileError::Store(StoreError::NotFound(_)) => "not-found",
            ReconcileError::Store(StoreError::Transient(_)) => "transient",
            ReconcileError::Panicked(_) => "panic",
        }
    }
}

/// What a successful reconcile did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The Robot is gone from the cache; nothing to do
    Deleted,
    /// The Deployment did not exist and was created
    Created,
    /// The Deployment's replica count was changed
    Scaled,
    /// The Deployment already matched the Robot
    InSync,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Deleted => "deleted",
            ReconcileOutcome::Created => "created",
            ReconcileOutcome::Scaled => "scaled",
            ReconcileOutcome::InSync => "in-sync",
        }
    }
}

/// Everything a reconcile needs: the two caches, the writer, and the event sink
pub struct Reconciler {
    pub robots: Cache<Robot>,
    pub deployments: Cache<Deployment>,
    pub writer: Arc<dyn ResourceWriter>,
    pub events: Arc<dyn EventPublisher>,
    pub status: StatusReporter,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("robots", &self.robots)
            .field("deployments", &self.deployments)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        robots: Cache<Robot>,
        deployments: Cache<Deployment>,
        writer: Arc<dyn ResourceWriter>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            robots,
            deployments,
            status: StatusReporter::new(Arc::clone(&writer)),
            writer,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(!ReconcileError::MalformedKey(InvalidKey("a/b/c".into())).is_retryable());
        assert!(!ReconcileError::InvalidSpec {
            key: "ns/r1".into(),
            reason: "target name must be specified".into()
        }
        .is_retryable());
        assert!(ReconcileError::OwnershipConflict {
            robot: "ns/r1".into(),
            deployment: "d1".into()
        }
        .is_retryable());
        assert!(ReconcileError::Store(StoreError::Transient("timeout".into())).is_retryable());
        assert!(ReconcileError::Store(StoreError::Conflict("rv".into())).is_retryable());
        assert!(ReconcileError::Panicked("boom".into()).is_retryable());
    }

    #[test]
    fn test_classification_labels() {
        assert_eq!(
            ReconcileError::Store(StoreError::Conflict("rv".into())).classification(),
            "conflict"
        );
        assert_eq!(
            ReconcileError::Store(StoreError::Transient("eof".into())).classification(),
            "transient"
        );
    }
}
