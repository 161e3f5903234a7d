//! # Store
//!
//! The remote object store as seen by the reconciler.
//!
//! - `cache`: read-through cache backed by a reflector store, populated by a watch
//! - `api`: direct writes against the API server
//!
//! Reads always go through the cache. Writes bypass it and go straight to the
//! API server; the cache catches up when the watch delivers the change.

mod api;
mod cache;

pub use self::api::KubeWriter;
pub use self::cache::{Cache, InvalidKey, ObjectKey};

use crate::crd::Robot;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use thiserror::Error;

/// Errors returned by store writes
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist (HTTP 404)
    #[error("{0} not found")]
    NotFound(String),
    /// Optimistic-concurrency or name collision (HTTP 409)
    #[error("conflict writing {0}")]
    Conflict(String),
    /// Network failure, API server unavailable, or any other write failure
    #[error("store request failed: {0}")]
    Transient(String),
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(api_err) if api_err.code == 404 => {
                StoreError::NotFound(api_err.message.clone())
            }
            kube::Error::Api(api_err) if api_err.code == 409 => {
                StoreError::Conflict(api_err.message.clone())
            }
            other => StoreError::Transient(other.to_string()),
        }
    }
}

/// Create/update verbs against the remote store.
///
/// Implementations must never be handed a cached object directly; callers
/// clone before mutating.
#[async_trait]
pub trait ResourceWriter: Send + Sync {
    /// Create a Deployment and return the object as persisted
    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError>;

    /// Replace a Deployment and return the object as persisted
    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError>;

    /// Write only the status block of a Robot
    async fn update_robot_status(&self, robot: &Robot) -> Result<Robot, StoreError>;
}
