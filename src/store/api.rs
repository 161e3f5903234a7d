//! # API Writer
//!
//! `ResourceWriter` backed by the Kubernetes API server.

use super::{ResourceWriter, StoreError};
use crate::constants::CONTROLLER_NAME;
use crate::crd::Robot;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

/// Writes Deployments and Robot status directly to the API server
#[derive(Clone)]
pub struct KubeWriter {
    client: Client,
}

impl std::fmt::Debug for KubeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeWriter").finish_non_exhaustive()
    }
}

impl KubeWriter {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn deployments(&self, deployment: &Deployment) -> Result<Api<Deployment>, StoreError> {
        let namespace = deployment.namespace().ok_or_else(|| {
            StoreError::Transient(format!("deployment {} has no namespace", deployment.name_any()))
        })?;
        Ok(Api::namespaced(self.client.clone(), &namespace))
    }
}

/// Every write is attributed to the controller as field manager
fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(CONTROLLER_NAME.to_string()),
        ..PostParams::default()
    }
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(CONTROLLER_NAME.to_string()),
        ..PatchParams::default()
    }
}

#[async_trait]
impl ResourceWriter for KubeWriter {
    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let api = self.deployments(deployment)?;
        debug!("Creating deployment {}", deployment.name_any());
        Ok(api.create(&post_params(), deployment).await?)
    }

    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let api = self.deployments(deployment)?;
        debug!(
            "Updating deployment {} at resourceVersion {:?}",
            deployment.name_any(),
            deployment.resource_version()
        );
        Ok(api
            .replace(&deployment.name_any(), &post_params(), deployment)
            .await?)
    }

    async fn update_robot_status(&self, robot: &Robot) -> Result<Robot, StoreError> {
        let namespace = robot.namespace().unwrap_or_default();
        let api: Api<Robot> = Api::namespaced(self.client.clone(), &namespace);

        // resourceVersion makes the patch conditional on the copy we started from
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": robot.resource_version() },
            "status": robot.status,
        });

        Ok(api
            .patch_status(
                &robot.name_any(),
                &patch_params(),
                &Patch::Merge(patch),
            )
            .await?)
    }
}
