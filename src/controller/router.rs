//! # Event Router
//!
//! Turns Robot and Deployment events into Robot reconcile keys.
//!
//! Deployment events are mapped to the Robot named by the Deployment's
//! controller owner reference. Deduplication is left to the work queue.

use crate::constants::ROBOT_KIND;
use crate::controller::informer::ResourceEvent;
use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::deployment::controller_of;
use crate::crd::Robot;
use crate::observability;
use crate::store::{Cache, ObjectKey};
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct EventRouter {
    robots: Cache<Robot>,
    queue: WorkQueue<String>,
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl EventRouter {
    #[must_use]
    pub fn new(robots: Cache<Robot>, queue: WorkQueue<String>) -> Self {
        Self { robots, queue }
    }

    /// Enqueue the Robot an event is about
    ///
    /// Updates are skipped when the resource version did not change.
    pub fn handle_robot_event(&self, event: &ResourceEvent<Robot>) {
        observability::metrics::increment_watch_events("Robot", event.label());

        if let ResourceEvent::Updated { old, new } = event {
            if old.resource_version() == new.resource_version() {
                return;
            }
        }
        if let Some(key) = ObjectKey::from_object(event.object().as_ref()) {
            self.queue.add(key.to_string());
        }
    }

    /// Enqueue the Robot that controls the Deployment an event is about
    pub fn handle_deployment_event(&self, event: &ResourceEvent<Deployment>) {
        observability::metrics::increment_watch_events("Deployment", event.label());

        if let ResourceEvent::Updated { old, new } = event {
            // Periodic re-lists deliver unchanged objects as updates
            if old.resource_version() == new.resource_version() {
                return;
            }
        }
        self.enqueue_owner(event.object().as_ref());
    }

    fn enqueue_owner(&self, deployment: &Deployment) {
        let Some(owner) = controller_of(deployment) else {
            return;
        };
        if owner.kind != ROBOT_KIND {
            return;
        }

        let namespace = deployment.namespace().unwrap_or_default();
        if self.robots.get(&namespace, &owner.name).is_none() {
            debug!(
                "Ignoring orphaned Deployment {}/{} of Robot {}",
                namespace,
                deployment.name_any(),
                owner.name
            );
            return;
        }

        self.queue
            .add(ObjectKey::new(namespace, owner.name.clone()).to_string());
    }

    /// Route events until both channels close or the queue shuts down
    pub async fn run(
        self,
        mut robots: mpsc::Receiver<ResourceEvent<Robot>>,
        mut deployments: mpsc::Receiver<ResourceEvent<Deployment>>,
    ) {
        let mut robots_open = true;
        let mut deployments_open = true;

        while (robots_open || deployments_open) && !self.queue.is_shutting_down() {
            tokio::select! {
                event = robots.recv(), if robots_open => match event {
                    Some(event) => self.handle_robot_event(&event),
                    None => robots_open = false,
                },
                event = deployments.recv(), if deployments_open => match event {
                    Some(event) => self.handle_deployment_event(&event),
                    None => deployments_open = false,
                },
            }
        }
        info!("Event router stopped");
    }
}
