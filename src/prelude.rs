//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use robot_operator::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Caches, keys and the write seam
pub use crate::store::{Cache, KubeWriter, ObjectKey, ResourceWriter, StoreError};

// Event ingestion and the work queue
pub use crate::controller::informer::{EventTranslator, Informer, ResourceEvent};
pub use crate::controller::queue::WorkQueue;
pub use crate::controller::router::EventRouter;

// Reconciler types
pub use crate::controller::reconciler::{ReconcileError, ReconcileOutcome, Reconciler};
pub use crate::events::{AuditEvent, EventPublisher, KubeEventPublisher, Severity};

// Config types
pub use crate::config::ControllerConfig;
pub use crate::runtime::error_policy::KeyOutcome;
