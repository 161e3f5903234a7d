//! # Events
//!
//! Audit events published against Robot resources.
//!
//! The publisher is built once at startup and handed to the reconciler; nothing
//! here touches process-wide state.

use crate::constants::{
    MESSAGE_RESOURCE_SYNCED, REASON_INVALID_SPEC, REASON_RESOURCE_EXISTS, REASON_SYNCED,
};
use crate::crd::Robot;
use async_trait::async_trait;
use kube::{Client, Resource, ResourceExt};
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::{info, warn};

/// Severity of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
}

/// An event to attach to a Robot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub severity: Severity,
    pub reason: &'static str,
    pub action: &'static str,
    pub message: String,
}

impl AuditEvent {
    /// The Robot and its Deployment are in sync
    #[must_use]
    pub fn synced() -> Self {
        Self {
            severity: Severity::Normal,
            reason: REASON_SYNCED,
            action: "Reconcile",
            message: MESSAGE_RESOURCE_SYNCED.to_string(),
        }
    }

    /// The target Deployment exists and is controlled by something else
    #[must_use]
    pub fn resource_exists(deployment: &str) -> Self {
        Self {
            severity: Severity::Warning,
            reason: REASON_RESOURCE_EXISTS,
            action: "Reconcile",
            message: format!("Resource {deployment:?} already exists and is not managed by Robot"),
        }
    }

    /// The Robot spec cannot be acted on
    #[must_use]
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            reason: REASON_INVALID_SPEC,
            action: "Validate",
            message: message.into(),
        }
    }
}

/// Sink for audit events
///
/// Publishing is best effort: failures are logged by the implementation and
/// never fail a reconcile.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, robot: &Robot, event: AuditEvent);
}

/// Publishes events to the API server through a `kube_runtime` recorder
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventPublisher").finish_non_exhaustive()
    }
}

impl KubeEventPublisher {
    /// `instance` identifies this controller replica (usually the pod name)
    #[must_use]
    pub fn new(client: Client, controller: &str, instance: Option<String>) -> Self {
        let reporter = Reporter {
            controller: controller.to_string(),
            instance,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, robot: &Robot, event: AuditEvent) {
        let type_ = match event.severity {
            Severity::Normal => EventType::Normal,
            Severity::Warning => EventType::Warning,
        };
        let reference = robot.object_ref(&());
        let result = self
            .recorder
            .publish(
                &Event {
                    type_,
                    reason: event.reason.to_string(),
                    note: Some(event.message.clone()),
                    action: event.action.to_string(),
                    secondary: None,
                },
                &reference,
            )
            .await;

        match result {
            Ok(()) => info!(
                "Event {} on {}/{}: {}",
                event.reason,
                robot.namespace().unwrap_or_default(),
                robot.name_any(),
                event.message
            ),
            Err(e) => warn!(
                "Failed to publish {} event for {}: {}",
                event.reason,
                robot.name_any(),
                e
            ),
        }
    }
}
