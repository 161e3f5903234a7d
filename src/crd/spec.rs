//! # Robot Spec
//!
//! The `Robot` custom resource describes a Deployment the controller should
//! create and keep at a given replica count.

use super::status::RobotStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Robot Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: robot.example.com/v1
/// kind: Robot
/// metadata:
///   name: r1
///   namespace: default
/// spec:
///   targetName: d1
///   replicas: 3
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Robot",
    group = "robot.example.com",
    version = "v1",
    namespaced,
    status = "RobotStatus",
    shortname = "rb",
    printcolumn = r#"{"name":"Target", "type":"string", "jsonPath":".spec.targetName"}, {"name":"Desired", "type":"integer", "jsonPath":".spec.replicas"}, {"name":"Available", "type":"integer", "jsonPath":".status.availableReplicas"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RobotSpec {
    /// Name of the Deployment this Robot manages (same namespace)
    /// Older manifests use `deploymentName`
    #[serde(default, alias = "deploymentName")]
    pub target_name: String,
    /// Desired replica count. When absent the replica count is left alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

impl Robot {
    /// Replicas last reported on the status block, if any status was written
    #[must_use]
    pub fn reported_available_replicas(&self) -> Option<i32> {
        self.status.as_ref().map(|s| s.available_replicas)
    }
}
