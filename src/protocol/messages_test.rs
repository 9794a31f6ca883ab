use super::*;
use crate::test_utils::prepared_request;
use crate::ChangeRequestState;
use crate::NodeState;

fn discover_with(latest: Option<ChangeDetails>) -> DiscoverResponse {
    DiscoverResponse {
        node_name: "node-1".to_string(),
        stripe_id: 1,
        state: NodeState::default(),
        latest_change: latest,
        current_config_hash: None,
    }
}

#[test]
fn test_change_details_from_request() {
    let request = prepared_request("change-1", 3);
    let details = ChangeDetails::from(&request);

    assert_eq!(details.change_id, "change-1");
    assert_eq!(details.version, 3);
    assert_eq!(details.state, ChangeRequestState::Prepared);
    assert_eq!(details.summary, request.change.summary());
    assert_eq!(details.result_hash, request.result_hash);
}

#[test]
fn test_prepared_change_only_reports_pending_requests() {
    let mut request = prepared_request("change-1", 1);
    assert!(discover_with(None).prepared_change().is_none());
    assert_eq!(
        discover_with(Some(ChangeDetails::from(&request)))
            .prepared_change()
            .map(|d| d.change_id.as_str()),
        Some("change-1")
    );

    request.state = ChangeRequestState::Committed;
    assert!(discover_with(Some(ChangeDetails::from(&request))).prepared_change().is_none());
}

#[test]
fn test_prepare_response_accessors() {
    let accepted = PrepareResponse::Accepted {
        change_id: "c".to_string(),
        version: 1,
        result_hash: "abc".to_string(),
    };
    assert!(accepted.is_accepted());
    assert_eq!(accepted.result_hash(), Some("abc"));

    let rejected = PrepareResponse::Rejected(Rejection::new(RejectionReason::BadMode, "not activated"));
    assert!(!rejected.is_accepted());
    assert_eq!(rejected.result_hash(), None);
}

#[test]
fn test_rejection_display() {
    let rejection = Rejection::new(RejectionReason::VersionConflict, "proposed 1, highest 2");
    assert_eq!(rejection.to_string(), "version conflict: proposed 1, highest 2");
}

#[test]
fn test_prepare_message_survives_json_transport() {
    let message = PrepareMessage {
        change_id: "c".to_string(),
        version: 2,
        change: crate::Change::set(crate::Applicability::Cluster, "offheap-resources.main", "1GB"),
        host: "h".to_string(),
        user: "u".to_string(),
    };
    let json = serde_json::to_string(&message).unwrap();
    assert_eq!(serde_json::from_str::<PrepareMessage>(&json).unwrap(), message);
}
