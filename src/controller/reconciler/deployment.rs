//! # Deployment
//!
//! Building the Deployment a Robot asks for, and checking who controls an
//! existing one.

use crate::constants::{
    APP_LABEL_VALUE, CONTROLLER_LABEL, WORKLOAD_CONTAINER_IMAGE, WORKLOAD_CONTAINER_NAME,
};
use crate::crd::Robot;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

/// Labels shared by the Deployment selector and its pod template
#[must_use]
pub fn workload_labels(robot: &Robot) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), APP_LABEL_VALUE.to_string()),
        (CONTROLLER_LABEL.to_string(), robot.name_any()),
    ])
}

/// The Deployment a Robot wants, owned by the Robot
///
/// Returns `None` if the Robot has no name or UID, since it cannot be referenced
/// as an owner.
#[must_use]
pub fn new_deployment(robot: &Robot) -> Option<Deployment> {
    let owner = robot.controller_owner_ref(&())?;
    let labels = workload_labels(robot);

    Some(Deployment {
        metadata: ObjectMeta {
            name: Some(robot.spec.target_name.clone()),
            namespace: robot.namespace(),
            owner_references: Some(vec![owner]),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: robot.spec.replicas,
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: WORKLOAD_CONTAINER_NAME.to_string(),
                        image: Some(WORKLOAD_CONTAINER_IMAGE.to_string()),
                        ..Container::default()
                    }],
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        status: None,
    })
}

/// The owner reference flagged as controller, if any
#[must_use]
pub fn controller_of<K: Resource>(obj: &K) -> Option<&OwnerReference> {
    obj.meta()
        .owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|owner| owner.controller == Some(true))
}

/// Whether the Deployment's controller reference points at this exact Robot
#[must_use]
pub fn is_controlled_by(deployment: &Deployment, robot: &Robot) -> bool {
    match (controller_of(deployment), robot.uid()) {
        (Some(owner), Some(uid)) => owner.uid == uid,
        _ => false,
    }
}

/// Declared replica count
#[must_use]
pub fn declared_replicas(deployment: &Deployment) -> Option<i32> {
    deployment.spec.as_ref().and_then(|spec| spec.replicas)
}

/// Replicas the Deployment reports as available; zero when no status yet
#[must_use]
pub fn available_replicas(deployment: &Deployment) -> i32 {
    deployment
        .status
        .as_ref()
        .and_then(|status| status.available_replicas)
        .unwrap_or(0)
}
