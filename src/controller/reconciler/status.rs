//! # Status Updates
//!
//! Writes the observed available replica count back onto the Robot.

use crate::crd::{Robot, RobotStatus};
use crate::observability;
use crate::store::{ResourceWriter, StoreError};
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

pub struct StatusReporter {
    writer: Arc<dyn ResourceWriter>,
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter").finish_non_exhaustive()
    }
}

impl StatusReporter {
    #[must_use]
    pub fn new(writer: Arc<dyn ResourceWriter>) -> Self {
        Self { writer }
    }

    /// Record `available_replicas` on the Robot's status
    ///
    /// Works on a copy of the cached Robot. Skips the write when the status
    /// already holds the value, so a converged Robot produces no watch traffic.
    /// Returns whether a write was issued.
    ///
    /// # Errors
    ///
    /// Returns the store error if the status write fails.
    pub async fn report(&self, robot: &Robot, available_replicas: i32) -> Result<bool, StoreError> {
        if robot.reported_available_replicas() == Some(available_replicas) {
            debug!(
                "Skipping status update for {} - availableReplicas unchanged: {}",
                robot.name_any(),
                available_replicas
            );
            return Ok(false);
        }

        let mut copy = robot.clone();
        copy.status = Some(RobotStatus { available_replicas });
        self.writer.update_robot_status(&copy).await?;
        observability::metrics::increment_status_updates();

        debug!(
            "Updated status of {}: availableReplicas={}",
            robot.name_any(),
            available_replicas
        );
        Ok(true)
    }
}
