//! Case 1: One node refuses a data directory and the change is rolled back
//!
//! Scenario:
//!
//! 1. Node 3 already uses data directory `main` at another location.
//! 2. Activate the 3 nodes at version 1.
//! 3. Set `data-dirs.main` cluster-wide.
//! 4. Run a second, valid change.
//!
//! Expected Result:
//!
//! - Nodes 1 and 2 accept and then roll back, node 3 rejects
//! - No node moves past version 1 and the documents are unchanged
//! - The next change is numbered above the burned version 2

use std::sync::Arc;

use dconf::Applicability;
use dconf::Change;
use dconf::ChangeError;
use dconf::ChangeRequestState;
use dconf::ChangeStatus;
use dconf::DataDirectories;
use dconf::Error;
use dconf::LocalDataDirectories;
use dconf::PhaseResult;
use tracing_test::traced_test;

use crate::common::TestContext;

#[tokio::test]
#[traced_test]
async fn test_rejecting_node_rolls_back_the_others() {
    let elsewhere = tempfile::tempdir().unwrap();
    let ctx = TestContext::start_with(|index| {
        if index != 3 {
            return None;
        }
        let live = LocalDataDirectories::new(elsewhere.path());
        live.add_data_directory("main", &elsewhere.path().join("existing")).unwrap();
        Some(Arc::new(live) as Arc<dyn DataDirectories>)
    });
    ctx.activate().await;
    let activated = ctx.documents(1);

    let coordinator = ctx.coordinator().await;
    let outcome = coordinator
        .run_change(Change::set(Applicability::Cluster, "data-dirs.main", "main-data"))
        .await
        .unwrap();

    assert_eq!(outcome.status, ChangeStatus::RolledBack);
    assert_eq!(outcome.version, 2);
    assert_eq!(outcome.nodes[0].prepare, PhaseResult::Ok);
    assert_eq!(outcome.nodes[1].prepare, PhaseResult::Ok);
    assert!(matches!(&outcome.nodes[2].prepare, PhaseResult::Rejected(reason) if reason.contains("already registered")));
    assert_eq!(outcome.nodes[0].decision, Some(PhaseResult::Ok));
    assert_eq!(outcome.nodes[1].decision, Some(PhaseResult::Ok));
    assert_eq!(outcome.nodes[2].decision, None);

    assert_eq!(ctx.current_versions(), vec![1, 1, 1]);
    assert_eq!(ctx.documents(1), activated);
    assert_eq!(ctx.documents(2), vec![None, None, None]);
    for i in 0..2 {
        let state = ctx.server(i).state().unwrap();
        assert_eq!(state.highest_version, 2);
        let history = ctx.server(i).change_history().unwrap();
        assert_eq!(history.last().unwrap().state, ChangeRequestState::RolledBack);
    }

    match outcome.into_result() {
        Err(Error::Change(ChangeError::Rejected { details, .. })) => assert!(details.contains("already registered")),
        other => panic!("unexpected result: {:?}", other),
    }

    let next = coordinator
        .run_change(Change::set(Applicability::Cluster, "offheap-resources.main", "64MB"))
        .await
        .unwrap();
    assert!(next.is_committed());
    assert_eq!(next.version, 3);
    assert_eq!(ctx.current_versions(), vec![3, 3, 3]);
}
