//! Robot Operator Library
//!
//! A Kubernetes controller that keeps an `apps/v1` Deployment in sync with each
//! `Robot` custom resource and reports the Deployment's available replicas back
//! on the Robot's status.
//!
//! ## Quick Start
//!
//! ```rust
//! use robot_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod cli;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod events;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod store;
