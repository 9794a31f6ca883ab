//! Case 1: A commit lost on one node is finished by the next coordinator
//!
//! Scenario:
//!
//! 1. Activate the 3 nodes at version 1.
//! 2. Run a change whose commit never reaches node 3.
//! 3. Recover, explicitly or as the first step of the next change.
//!
//! Expected Result:
//!
//! - The first run ends `Inconsistent` with node 3 still prepared
//! - Recovery commits the change on node 3 because the others committed it
//! - Afterwards the cluster is consistent and accepts new changes

use std::sync::Arc;

use dconf::Applicability;
use dconf::Change;
use dconf::ChangeStatus;
use dconf::PhaseResult;
use tracing_test::traced_test;

use crate::common::CommitDroppingConnector;
use crate::common::TestContext;

async fn leave_node_3_prepared(ctx: &TestContext) -> String {
    let connector = Arc::new(CommitDroppingConnector::new(ctx.connector.clone()));
    connector.block_commits_to(&ctx.addresses[2]);
    let coordinator = ctx.factory(connector).create_coordinator(&ctx.addresses).await.unwrap();

    let outcome = coordinator
        .run_change(Change::set(Applicability::Cluster, "offheap-resources.main", "1GB"))
        .await
        .unwrap();

    assert_eq!(outcome.status, ChangeStatus::Inconsistent);
    assert_eq!(outcome.nodes[0].decision, Some(PhaseResult::Ok));
    assert_eq!(outcome.nodes[1].decision, Some(PhaseResult::Ok));
    assert!(matches!(outcome.nodes[2].decision, Some(PhaseResult::Failed(_))));
    assert_eq!(ctx.current_versions(), vec![2, 2, 1]);
    assert!(ctx.server(2).discover().unwrap().prepared_change().is_some());
    outcome.change_id
}

#[tokio::test]
#[traced_test]
async fn test_explicit_recovery_commits_lagging_node() {
    let ctx = TestContext::start();
    ctx.activate().await;
    let change_id = leave_node_3_prepared(&ctx).await;

    let outcomes = ctx.coordinator().await.recover().await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].change_id, change_id);
    assert_eq!(outcomes[0].status, ChangeStatus::Committed);
    assert_eq!(outcomes[0].version, 2);
    assert_eq!(outcomes[0].nodes.len(), 1);
    assert_eq!(outcomes[0].nodes[0].address, ctx.addresses[2]);
    assert_eq!(ctx.current_versions(), vec![2, 2, 2]);
    let documents = ctx.documents(2);
    assert!(documents.iter().all(|d| d.is_some() && *d == documents[0]));
}

#[tokio::test]
#[traced_test]
async fn test_next_change_recovers_before_preparing() {
    let ctx = TestContext::start();
    ctx.activate().await;
    leave_node_3_prepared(&ctx).await;

    let outcome = ctx
        .coordinator()
        .await
        .run_change(Change::set(Applicability::Cluster, "offheap-resources.cache", "128MB"))
        .await
        .unwrap();

    assert!(outcome.is_committed());
    assert_eq!(outcome.version, 3);
    assert_eq!(ctx.current_versions(), vec![3, 3, 3]);
    let topology = ctx.server(2).topology().unwrap();
    assert_eq!(topology.offheap_resources.get("main"), Some(&(1024 * 1024 * 1024)));
    assert_eq!(topology.offheap_resources.get("cache"), Some(&(128 * 1024 * 1024)));
}

#[tokio::test]
#[traced_test]
async fn test_recovery_without_prepared_changes_is_a_no_op() {
    let ctx = TestContext::start();
    ctx.activate().await;

    let outcomes = ctx.coordinator().await.recover().await.unwrap();

    assert!(outcomes.is_empty());
    assert_eq!(ctx.current_versions(), vec![1, 1, 1]);
}
