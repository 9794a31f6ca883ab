//! Case 1: A node restarted while holding a prepared change
//!
//! Scenario:
//!
//! 1. Activate the 3 nodes at version 1.
//! 2. Run a change whose commit never reaches node 3.
//! 3. Restart node 3 over its database.
//! 4. Recover.
//!
//! Expected Result:
//!
//! - Node 3 comes back at version 1 with the change still prepared
//! - Recovery commits it there, rendering the same document as its peers

use std::sync::Arc;

use dconf::Applicability;
use dconf::Change;
use dconf::ChangeRequestState;
use dconf::ChangeStatus;
use tracing_test::traced_test;

use crate::common::CommitDroppingConnector;
use crate::common::TestContext;

#[tokio::test]
#[traced_test]
async fn test_restarted_node_is_recovered() {
    let mut ctx = TestContext::start();
    ctx.activate().await;
    let change_id = {
        let connector = Arc::new(CommitDroppingConnector::new(ctx.connector.clone()));
        connector.block_commits_to(&ctx.addresses[2]);
        let coordinator = ctx.factory(connector).create_coordinator(&ctx.addresses).await.unwrap();
        let outcome = coordinator
            .run_change(Change::set(Applicability::Cluster, "offheap-resources.main", "2GB"))
            .await
            .unwrap();
        assert_eq!(outcome.status, ChangeStatus::Inconsistent);
        outcome.change_id
    };

    ctx.restart(2);

    let view = ctx.server(2).discover().unwrap();
    assert_eq!(view.state.current_version, 1);
    assert_eq!(view.prepared_change().map(|d| d.change_id.clone()), Some(change_id.clone()));

    let outcomes = ctx.coordinator().await.recover().await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_committed());
    assert_eq!(ctx.current_versions(), vec![2, 2, 2]);
    let documents = ctx.documents(2);
    assert_eq!(documents[2], documents[0]);
    let history = ctx.server(2).change_history().unwrap();
    let latest = history.last().unwrap();
    assert_eq!(latest.change_id, change_id);
    assert_eq!(latest.state, ChangeRequestState::Committed);
}
