//! # Robot Status
//!
//! Observed state copied from the owned Deployment.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of the Robot resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RobotStatus {
    /// Available replicas last reported by the owned Deployment
    #[serde(default)]
    pub available_replicas: i32,
}
