//! Case 1: A composite change is all or nothing
//!
//! Scenario:
//!
//! 1. Activate the 3 nodes at version 1.
//! 2. Run a change adding offheap resource `main` and, in the same change, an unparseable size for `cache`.
//!
//! Expected Result:
//!
//! - Every node rejects, nothing is rolled back because nothing was accepted
//! - The topology in effect has no offheap resource at all

use dconf::Applicability;
use dconf::Change;
use dconf::ChangeStatus;
use dconf::PhaseResult;
use dconf::SettingChange;
use tracing_test::traced_test;

use crate::common::TestContext;

#[tokio::test]
#[traced_test]
async fn test_invalid_member_rejects_whole_change() {
    let ctx = TestContext::start();
    ctx.activate().await;

    let outcome = ctx
        .coordinator()
        .await
        .run_change(Change::Multiple(vec![
            SettingChange::set(Applicability::Cluster, "offheap-resources.main", "256MB"),
            SettingChange::set(Applicability::Cluster, "offheap-resources.cache", "lots"),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome.status, ChangeStatus::RolledBack);
    assert!(outcome
        .nodes
        .iter()
        .all(|report| matches!(report.prepare, PhaseResult::Rejected(_)) && report.decision.is_none()));
    assert_eq!(ctx.current_versions(), vec![1, 1, 1]);
    for i in 0..ctx.nodes.len() {
        assert!(ctx.server(i).topology().unwrap().offheap_resources.is_empty());
    }
}
