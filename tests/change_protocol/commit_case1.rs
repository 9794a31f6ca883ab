//! Case 1: A cluster-wide offheap resource reaches every node
//!
//! Scenario:
//!
//! 1. Start 3 uninitialized nodes and activate them at version 1.
//! 2. Set `offheap-resources.main` to 1GB cluster-wide.
//! 3. Commit the same change id a second time on node 1.
//!
//! Expected Result:
//!
//! - The change commits at version 2 on all nodes
//! - All nodes store the same document, whose hash is the one recorded in the change history
//! - The repeated commit reports `already_committed` without moving the version

use dconf::utils::hash::generate_hash;
use dconf::Applicability;
use dconf::Change;
use dconf::ChangeRequestState;
use dconf::ChangeStatus;
use dconf::Cluster;
use dconf::CommitMessage;
use dconf::PhaseResult;
use tracing_test::traced_test;

use crate::common::TestContext;
use crate::common::ADMIN_HOST;
use crate::common::ADMIN_USER;

#[tokio::test]
#[traced_test]
async fn test_offheap_resource_commits_on_every_node() {
    let ctx = TestContext::start();
    ctx.activate().await;
    assert_eq!(ctx.current_versions(), vec![1, 1, 1]);

    let outcome = ctx
        .coordinator()
        .await
        .run_change(Change::set(Applicability::Cluster, "offheap-resources.main", "1GB"))
        .await
        .unwrap();

    assert_eq!(outcome.status, ChangeStatus::Committed);
    assert_eq!(outcome.version, 2);
    assert!(outcome
        .nodes
        .iter()
        .all(|report| report.prepare.is_ok() && report.decision == Some(PhaseResult::Ok)));
    assert_eq!(ctx.current_versions(), vec![2, 2, 2]);

    let documents = ctx.documents(2);
    let document = documents[0].clone().unwrap();
    assert!(documents.iter().all(|d| d.as_deref() == Some(document.as_str())));

    let cluster = Cluster::parse(&document).unwrap();
    assert_eq!(cluster.offheap_resources.get("main"), Some(&(1024 * 1024 * 1024)));

    for i in 0..ctx.nodes.len() {
        let history = ctx.server(i).change_history().unwrap();
        let latest = history.last().unwrap();
        assert_eq!(latest.change_id, outcome.change_id);
        assert_eq!(latest.state, ChangeRequestState::Committed);
        assert_eq!(latest.creation_host, ADMIN_HOST);
        assert_eq!(latest.creation_user, ADMIN_USER);
        assert_eq!(latest.result_hash, generate_hash(&document));
    }
}

#[tokio::test]
#[traced_test]
async fn test_repeated_commit_is_idempotent() {
    let ctx = TestContext::start();
    ctx.activate().await;
    let outcome = ctx
        .coordinator()
        .await
        .run_change(Change::set(Applicability::Cluster, "offheap-resources.main", "512MB"))
        .await
        .unwrap();
    assert!(outcome.is_committed());

    let response = ctx
        .server(0)
        .commit(CommitMessage {
            change_id: outcome.change_id.clone(),
            host: ADMIN_HOST.to_string(),
            user: ADMIN_USER.to_string(),
        })
        .unwrap();

    assert!(response.already_committed);
    assert_eq!(response.version, 2);
    assert_eq!(ctx.current_versions(), vec![2, 2, 2]);
}
