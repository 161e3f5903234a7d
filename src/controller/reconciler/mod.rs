//! # Reconciler
//!
//! Core reconciliation logic for `Robot` resources.
//!
//! The reconciler:
//! - Looks the Robot up in the local cache by its `namespace/name` key
//! - Creates the target Deployment if it does not exist yet
//! - Refuses to touch a Deployment controlled by anything else
//! - Scales the Deployment to the declared replica count
//! - Updates `status.availableReplicas` from the Deployment
//!
//! ## Reconciliation Flow
//!
//! 1. Parse the key and fetch the Robot (gone means done)
//! 2. Validate the target name
//! 3. Create or fetch the Deployment and check ownership
//! 4. Scale if needed
//! 5. Update status and publish a `Synced` event

pub mod deployment;
pub mod reconcile;
pub mod status;
pub mod types;

pub use deployment::new_deployment;
pub use status::StatusReporter;
pub use types::{ReconcileError, ReconcileOutcome, Reconciler};
