//! Common test utilities
//!
//! `FakeCluster` stands in for the API server: it implements `ResourceWriter`
//! and `EventPublisher`, applies every successful write to reflector-backed
//! caches (as a watch would), and records writes and events for assertions.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use kube_runtime::reflector::store::Writer;
use kube_runtime::watcher;
use robot_operator::controller::reconciler::{new_deployment, Reconciler};
use robot_operator::crd::{Robot, RobotSpec};
use robot_operator::events::{AuditEvent, EventPublisher};
use robot_operator::store::{Cache, ResourceWriter, StoreError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A write that reached the fake API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    CreateDeployment { name: String, replicas: Option<i32> },
    UpdateDeployment { name: String, replicas: Option<i32> },
    UpdateRobotStatus { name: String, available_replicas: i32 },
}

pub struct FakeCluster {
    robot_writer: Mutex<Writer<Robot>>,
    deployment_writer: Mutex<Writer<Deployment>>,
    pub robots: Cache<Robot>,
    pub deployments: Cache<Deployment>,
    next_version: AtomicU64,
    writes: Mutex<Vec<WriteOp>>,
    events: Mutex<Vec<(String, AuditEvent)>>,
    fail_next_write: Mutex<Option<StoreError>>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        let robot_writer = Writer::<Robot>::default();
        let deployment_writer = Writer::<Deployment>::default();
        Arc::new(Self {
            robots: Cache::new(robot_writer.as_reader()),
            deployments: Cache::new(deployment_writer.as_reader()),
            robot_writer: Mutex::new(robot_writer),
            deployment_writer: Mutex::new(deployment_writer),
            next_version: AtomicU64::new(1),
            writes: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            fail_next_write: Mutex::new(None),
        })
    }

    /// Reconciler reading this cluster's caches and writing back to it
    pub fn reconciler(self: &Arc<Self>) -> Reconciler {
        Reconciler::new(
            self.robots.clone(),
            self.deployments.clone(),
            Arc::clone(self) as Arc<dyn ResourceWriter>,
            Arc::clone(self) as Arc<dyn EventPublisher>,
        )
    }

    fn bump(&self, meta: &mut ObjectMeta) {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        meta.resource_version = Some(version.to_string());
        if meta.uid.is_none() {
            meta.uid = Some(format!("uid-{version}"));
        }
    }

    fn store_robot(&self, robot: &Robot) {
        self.robot_writer
            .lock()
            .unwrap()
            .apply_watcher_event(&watcher::Event::Apply(robot.clone()));
    }

    fn store_deployment(&self, deployment: &Deployment) {
        self.deployment_writer
            .lock()
            .unwrap()
            .apply_watcher_event(&watcher::Event::Apply(deployment.clone()));
    }

    /// Complete the Robot cache's initial list with the objects applied so far
    pub fn sync_robots(&self) {
        replay_initial_list(&mut self.robot_writer.lock().unwrap());
    }

    /// Complete the Deployment cache's initial list with the objects applied so far
    pub fn sync_deployments(&self) {
        replay_initial_list(&mut self.deployment_writer.lock().unwrap());
    }

    /// Create or edit a Robot as a user would
    pub fn apply_robot(&self, mut robot: Robot) -> Robot {
        if let Some(existing) = self
            .robots
            .get(&robot.namespace().unwrap_or_default(), &robot.name_any())
        {
            robot.metadata.uid.clone_from(&existing.metadata.uid);
            if robot.status.is_none() {
                robot.status.clone_from(&existing.status);
            }
        }
        self.bump(&mut robot.metadata);
        self.store_robot(&robot);
        robot
    }

    pub fn delete_robot(&self, namespace: &str, name: &str) {
        if let Some(robot) = self.robots.get(namespace, name) {
            self.robot_writer
                .lock()
                .unwrap()
                .apply_watcher_event(&watcher::Event::Delete((*robot).clone()));
        }
    }

    /// Create a Deployment directly, as another actor would
    pub fn apply_deployment(&self, mut deployment: Deployment) -> Deployment {
        self.bump(&mut deployment.metadata);
        self.store_deployment(&deployment);
        deployment
    }

    /// Simulate the Deployment controller reporting available replicas
    pub fn report_available(&self, namespace: &str, name: &str, available: i32) {
        let mut deployment = (*self.deployments.get(namespace, name).unwrap()).clone();
        deployment
            .status
            .get_or_insert_with(DeploymentStatus::default)
            .available_replicas = Some(available);
        self.apply_deployment(deployment);
    }

    /// Simulate someone editing the Deployment's replica count
    pub fn set_deployment_replicas(&self, namespace: &str, name: &str, replicas: i32) {
        let mut deployment = (*self.deployments.get(namespace, name).unwrap()).clone();
        deployment
            .spec
            .get_or_insert_with(DeploymentSpec::default)
            .replicas = Some(replicas);
        self.apply_deployment(deployment);
    }

    /// Make the next write fail with `error`
    pub fn fail_next_write(&self, error: StoreError) {
        *self.fail_next_write.lock().unwrap() = Some(error);
    }

    fn injected_failure(&self) -> Result<(), StoreError> {
        match self.fail_next_write.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn writes(&self) -> Vec<WriteOp> {
        self.writes.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<(String, AuditEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_reasons(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event)| event.reason)
            .collect()
    }

    pub fn clear_log(&self) {
        self.writes.lock().unwrap().clear();
        self.events.lock().unwrap().clear();
    }
}

/// Re-list the writer's current contents and mark its store ready
fn replay_initial_list<K>(writer: &mut Writer<K>)
where
    K: kube::Resource<DynamicType = ()> + Clone + 'static,
{
    let objects = writer.as_reader().state();
    writer.apply_watcher_event(&watcher::Event::Init);
    for obj in objects {
        writer.apply_watcher_event(&watcher::Event::InitApply((*obj).clone()));
    }
    writer.apply_watcher_event(&watcher::Event::InitDone);
}

fn replicas_of(deployment: &Deployment) -> Option<i32> {
    deployment.spec.as_ref().and_then(|spec| spec.replicas)
}

#[async_trait]
impl ResourceWriter for FakeCluster {
    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
        self.injected_failure()?;
        let namespace = deployment.namespace().unwrap_or_default();
        let name = deployment.name_any();
        if self.deployments.get(&namespace, &name).is_some() {
            return Err(StoreError::Conflict(format!("{namespace}/{name} already exists")));
        }

        let mut created = deployment.clone();
        self.bump(&mut created.metadata);
        self.store_deployment(&created);
        self.writes.lock().unwrap().push(WriteOp::CreateDeployment {
            name,
            replicas: replicas_of(&created),
        });
        Ok(created)
    }

    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
        self.injected_failure()?;
        let namespace = deployment.namespace().unwrap_or_default();
        let name = deployment.name_any();
        let current = self
            .deployments
            .get(&namespace, &name)
            .ok_or_else(|| StoreError::NotFound(format!("{namespace}/{name}")))?;
        if current.resource_version() != deployment.resource_version() {
            return Err(StoreError::Conflict(format!("{namespace}/{name} was modified")));
        }

        let mut updated = deployment.clone();
        self.bump(&mut updated.metadata);
        self.store_deployment(&updated);
        self.writes.lock().unwrap().push(WriteOp::UpdateDeployment {
            name,
            replicas: replicas_of(&updated),
        });
        Ok(updated)
    }

    async fn update_robot_status(&self, robot: &Robot) -> Result<Robot, StoreError> {
        self.injected_failure()?;
        let namespace = robot.namespace().unwrap_or_default();
        let name = robot.name_any();
        let current = self
            .robots
            .get(&namespace, &name)
            .ok_or_else(|| StoreError::NotFound(format!("{namespace}/{name}")))?;
        if current.resource_version() != robot.resource_version() {
            return Err(StoreError::Conflict(format!("{namespace}/{name} was modified")));
        }

        // Status subresource: only the status block changes
        let mut updated = (*current).clone();
        updated.status.clone_from(&robot.status);
        self.bump(&mut updated.metadata);
        self.store_robot(&updated);
        self.writes.lock().unwrap().push(WriteOp::UpdateRobotStatus {
            name,
            available_replicas: robot
                .status
                .as_ref()
                .map_or(0, |status| status.available_replicas),
        });
        Ok(updated)
    }
}

#[async_trait]
impl EventPublisher for FakeCluster {
    async fn publish(&self, robot: &Robot, event: AuditEvent) {
        let key = format!("{}/{}", robot.namespace().unwrap_or_default(), robot.name_any());
        self.events.lock().unwrap().push((key, event));
    }
}

/// A Robot in `default` that has not been stored yet
pub fn robot(name: &str, target: &str, replicas: Option<i32>) -> Robot {
    let mut robot = Robot::new(
        name,
        RobotSpec {
            target_name: target.to_string(),
            replicas,
        },
    );
    robot.metadata.namespace = Some("default".to_string());
    robot
}

/// A Deployment owned by a Robot that is not the one under test
pub fn foreign_deployment(name: &str, replicas: i32) -> Deployment {
    let mut owner = robot("someone-else", name, Some(replicas));
    owner.metadata.uid = Some("foreign-uid".to_string());
    new_deployment(&owner).unwrap()
}
