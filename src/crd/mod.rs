//! # Custom Resource Definitions
//!
//! CRD types for the Robot Operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - The `Robot` resource and its spec
//! - `status.rs` - Status reported back from the owned Deployment

mod spec;
mod status;

pub use spec::{Robot, RobotSpec};
pub use status::RobotStatus;
