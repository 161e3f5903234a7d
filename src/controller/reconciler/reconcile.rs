//! # Reconciliation Logic
//!
//! Drives one Robot key toward its desired state: the target Deployment
//! exists, is owned by the Robot, runs the declared replica count, and the
//! Robot's status reflects what the Deployment reports.

use super::deployment::{available_replicas, declared_replicas, is_controlled_by, new_deployment};
use super::types::{ReconcileError, ReconcileOutcome, Reconciler};
use crate::crd::Robot;
use crate::events::AuditEvent;
use crate::observability;
use crate::store::ObjectKey;
use k8s_openapi::api::apps::v1::Deployment;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

impl Reconciler {
    /// Reconcile the Robot identified by `key` (`namespace/name`)
    ///
    /// Reads only from the caches and never mutates cached objects. A Robot
    /// that is gone from the cache is treated as success: garbage collection
    /// removes the Deployment through its owner reference.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::MalformedKey`] for keys that do not parse
    /// - [`ReconcileError::InvalidSpec`] when the Robot has no target name
    /// - [`ReconcileError::OwnershipConflict`] when the target Deployment belongs to someone else
    /// - [`ReconcileError::Store`] when a write fails
    pub async fn reconcile(&self, key: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let span = tracing::info_span!(
            "reconcile",
            resource.kind = "Robot",
            resource.namespace = tracing::field::Empty,
            resource.name = tracing::field::Empty
        );
        let start = Instant::now();
        observability::metrics::increment_reconciliations();

        let result = self.reconcile_key(key).instrument(span).await;

        observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        result
    }

    async fn reconcile_key(&self, key: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let ObjectKey { namespace, name } = key.parse::<ObjectKey>()?;
        tracing::Span::current()
            .record("resource.namespace", namespace.as_str())
            .record("resource.name", name.as_str());

        let Some(robot) = self.robots.get(&namespace, &name) else {
            debug!("Robot '{}' in work queue no longer exists", key);
            return Ok(ReconcileOutcome::Deleted);
        };

        let target = robot.spec.target_name.as_str();
        if target.is_empty() {
            let reason = "target name must be specified".to_string();
            warn!("Robot {}: {}", key, reason);
            self.events
                .publish(&robot, AuditEvent::invalid_spec(reason.clone()))
                .await;
            return Err(ReconcileError::InvalidSpec {
                key: key.to_string(),
                reason,
            });
        }

        let (available, outcome) = match self.deployments.get(&namespace, target) {
            None => {
                let available = self.create(&robot, key).await?;
                (available, ReconcileOutcome::Created)
            }
            Some(existing) => {
                if !is_controlled_by(&existing, &robot) {
                    warn!(
                        "Deployment {}/{} exists but is not controlled by Robot {}",
                        namespace, target, key
                    );
                    self.events
                        .publish(&robot, AuditEvent::resource_exists(target))
                        .await;
                    return Err(ReconcileError::OwnershipConflict {
                        robot: key.to_string(),
                        deployment: target.to_string(),
                    });
                }
                self.scale_if_needed(&robot, &existing, key).await?
            }
        };

        self.status.report(&robot, available).await?;
        self.events.publish(&robot, AuditEvent::synced()).await;

        info!("✅ Robot {} synced ({})", key, outcome.as_str());
        Ok(outcome)
    }

    /// Create the target Deployment and return its available replica count
    async fn create(&self, robot: &Robot, key: &str) -> Result<i32, ReconcileError> {
        let desired = new_deployment(robot).ok_or_else(|| ReconcileError::InvalidSpec {
            key: key.to_string(),
            reason: "robot has no uid to use as owner".to_string(),
        })?;

        info!(
            "Creating Deployment {} for Robot {} (replicas: {:?})",
            robot.spec.target_name, key, robot.spec.replicas
        );
        let created = self.writer.create_deployment(&desired).await?;
        observability::metrics::increment_deployments_created();

        Ok(available_replicas(&created))
    }

    /// Bring the Deployment's replica count in line with the Robot
    ///
    /// A Robot without `replicas` leaves the count alone.
    async fn scale_if_needed(
        &self,
        robot: &Robot,
        existing: &Deployment,
        key: &str,
    ) -> Result<(i32, ReconcileOutcome), ReconcileError> {
        let current = declared_replicas(existing);
        let desired = match robot.spec.replicas {
            Some(desired) if current != Some(desired) => desired,
            _ => return Ok((available_replicas(existing), ReconcileOutcome::InSync)),
        };

        info!(
            "Robot {} replicas: {}, deployment replicas: {:?}",
            key, desired, current
        );
        let mut scaled = existing.clone();
        scaled.spec.get_or_insert_with(Default::default).replicas = Some(desired);
        let updated = self.writer.update_deployment(&scaled).await?;
        observability::metrics::increment_deployments_updated();

        Ok((available_replicas(&updated), ReconcileOutcome::Scaled))
    }
}
