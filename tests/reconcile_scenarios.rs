//! # Reconcile Scenarios
//!
//! End-to-end reconcile behaviour against an in-memory cluster: creation,
//! convergence, status propagation, ownership conflicts and invalid specs.

mod common;

use common::{foreign_deployment, robot, FakeCluster, WriteOp};
use robot_operator::controller::reconciler::deployment::controller_of;
use robot_operator::controller::reconciler::{ReconcileError, ReconcileOutcome};
use robot_operator::events::Severity;
use robot_operator::store::StoreError;

#[tokio::test]
async fn test_creates_owned_deployment_and_reports_zero_available() {
    let cluster = FakeCluster::new();
    let r1 = cluster.apply_robot(robot("r1", "d1", Some(3)));
    let reconciler = cluster.reconciler();

    let outcome = reconciler.reconcile("default/r1").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Created);
    assert_eq!(
        cluster.writes(),
        vec![
            WriteOp::CreateDeployment {
                name: "d1".to_string(),
                replicas: Some(3)
            },
            WriteOp::UpdateRobotStatus {
                name: "r1".to_string(),
                available_replicas: 0
            },
        ]
    );

    let d1 = cluster.deployments.get("default", "d1").unwrap();
    let owner = controller_of(d1.as_ref()).unwrap();
    assert_eq!(owner.name, "r1");
    assert_eq!(Some(owner.uid.as_str()), r1.metadata.uid.as_deref());

    let stored = cluster.robots.get("default", "r1").unwrap();
    assert_eq!(stored.reported_available_replicas(), Some(0));
    assert_eq!(cluster.event_reasons(), vec!["Synced"]);
}

#[tokio::test]
async fn test_available_replicas_flow_back_without_spec_write() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "d1", Some(3)));
    let reconciler = cluster.reconciler();
    reconciler.reconcile("default/r1").await.unwrap();
    cluster.clear_log();

    cluster.report_available("default", "d1", 3);
    let outcome = reconciler.reconcile("default/r1").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::InSync);
    assert_eq!(
        cluster.writes(),
        vec![WriteOp::UpdateRobotStatus {
            name: "r1".to_string(),
            available_replicas: 3
        }]
    );
    assert_eq!(
        cluster
            .robots
            .get("default", "r1")
            .unwrap()
            .reported_available_replicas(),
        Some(3)
    );
}

#[tokio::test]
async fn test_foreign_deployment_is_never_touched() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "d1", Some(5)));
    let before = cluster.apply_deployment(foreign_deployment("d1", 1));
    let reconciler = cluster.reconciler();

    let err = reconciler.reconcile("default/r1").await.unwrap_err();

    assert!(matches!(err, ReconcileError::OwnershipConflict { .. }));
    assert!(err.is_retryable());
    assert!(cluster.writes().is_empty());

    let events = cluster.events();
    assert_eq!(events.len(), 1);
    let (key, event) = &events[0];
    assert_eq!(key, "default/r1");
    assert_eq!(event.severity, Severity::Warning);
    assert_eq!(event.reason, "ErrResourceExists");
    assert_eq!(
        event.message,
        "Resource \"d1\" already exists and is not managed by Robot"
    );

    let after = cluster.deployments.get("default", "d1").unwrap();
    assert_eq!(after.metadata.resource_version, before.metadata.resource_version);
}

#[tokio::test]
async fn test_conflict_event_emitted_once_per_attempt() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "d1", Some(5)));
    cluster.apply_deployment(foreign_deployment("d1", 1));
    let reconciler = cluster.reconciler();

    for _ in 0..3 {
        assert!(reconciler.reconcile("default/r1").await.is_err());
    }

    assert_eq!(
        cluster.event_reasons(),
        vec!["ErrResourceExists", "ErrResourceExists", "ErrResourceExists"]
    );
    assert!(cluster.writes().is_empty());
}

#[tokio::test]
async fn test_empty_target_name_is_invalid_and_writes_nothing() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "", Some(2)));
    let reconciler = cluster.reconciler();

    let err = reconciler.reconcile("default/r1").await.unwrap_err();

    assert!(matches!(err, ReconcileError::InvalidSpec { .. }));
    assert!(!err.is_retryable());
    assert!(cluster.writes().is_empty());
    assert_eq!(cluster.event_reasons(), vec!["InvalidSpec"]);
}

#[tokio::test]
async fn test_second_reconcile_is_write_free() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "d1", Some(2)));
    let reconciler = cluster.reconciler();
    reconciler.reconcile("default/r1").await.unwrap();
    cluster.clear_log();

    let outcome = reconciler.reconcile("default/r1").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::InSync);
    assert!(cluster.writes().is_empty());
}

#[tokio::test]
async fn test_replica_drift_is_corrected_with_one_update() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "d1", Some(2)));
    let reconciler = cluster.reconciler();
    reconciler.reconcile("default/r1").await.unwrap();
    cluster.set_deployment_replicas("default", "d1", 7);
    cluster.clear_log();

    let outcome = reconciler.reconcile("default/r1").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Scaled);
    assert_eq!(
        cluster.writes(),
        vec![WriteOp::UpdateDeployment {
            name: "d1".to_string(),
            replicas: Some(2)
        }]
    );

    cluster.clear_log();
    reconciler.reconcile("default/r1").await.unwrap();
    assert!(cluster.writes().is_empty());
}

#[tokio::test]
async fn test_robot_edit_scales_deployment() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "d1", Some(1)));
    let reconciler = cluster.reconciler();
    reconciler.reconcile("default/r1").await.unwrap();
    cluster.clear_log();

    cluster.apply_robot(robot("r1", "d1", Some(4)));
    reconciler.reconcile("default/r1").await.unwrap();

    assert_eq!(
        cluster.writes(),
        vec![WriteOp::UpdateDeployment {
            name: "d1".to_string(),
            replicas: Some(4)
        }]
    );
}

#[tokio::test]
async fn test_absent_replicas_leaves_count_alone() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "d1", None));
    let reconciler = cluster.reconciler();
    reconciler.reconcile("default/r1").await.unwrap();
    cluster.set_deployment_replicas("default", "d1", 6);
    cluster.clear_log();

    let outcome = reconciler.reconcile("default/r1").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::InSync);
    assert!(cluster.writes().is_empty());
}

#[tokio::test]
async fn test_missing_robot_is_success() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "d1", Some(1)));
    cluster.delete_robot("default", "r1");
    let reconciler = cluster.reconciler();

    assert_eq!(
        reconciler.reconcile("default/r1").await.unwrap(),
        ReconcileOutcome::Deleted
    );
    assert!(cluster.writes().is_empty());
    assert!(cluster.events().is_empty());
}

#[tokio::test]
async fn test_malformed_key_is_rejected() {
    let cluster = FakeCluster::new();
    let reconciler = cluster.reconciler();

    let err = reconciler.reconcile("a/b/c").await.unwrap_err();

    assert!(matches!(err, ReconcileError::MalformedKey(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_store_failure_is_retryable_and_recovers() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "d1", Some(3)));
    let reconciler = cluster.reconciler();
    cluster.fail_next_write(StoreError::Transient("connection reset".to_string()));

    let err = reconciler.reconcile("default/r1").await.unwrap_err();
    assert!(matches!(err, ReconcileError::Store(StoreError::Transient(_))));
    assert!(err.is_retryable());
    assert!(cluster.deployments.get("default", "d1").is_none());

    assert_eq!(
        reconciler.reconcile("default/r1").await.unwrap(),
        ReconcileOutcome::Created
    );
}

#[tokio::test]
async fn test_status_write_failure_bubbles_up() {
    let cluster = FakeCluster::new();
    cluster.apply_robot(robot("r1", "d1", Some(3)));
    let reconciler = cluster.reconciler();
    reconciler.reconcile("default/r1").await.unwrap();
    cluster.report_available("default", "d1", 2);
    cluster.fail_next_write(StoreError::Conflict("default/r1 was modified".to_string()));

    let err = reconciler.reconcile("default/r1").await.unwrap_err();

    assert!(matches!(err, ReconcileError::Store(StoreError::Conflict(_))));
    assert_eq!(
        cluster
            .robots
            .get("default", "r1")
            .unwrap()
            .reported_available_replicas(),
        Some(0)
    );
}
