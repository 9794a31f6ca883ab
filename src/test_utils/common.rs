use crate::utils::hash::generate_hash;
use crate::Applicability;
use crate::Change;
use crate::ChangeRequest;
use crate::ChangeRequestState;
use crate::Cluster;
use crate::Node;
use crate::Stripe;

pub const TEST_HOST: &str = "admin-host";
pub const TEST_USER: &str = "admin";

/// One stripe, nodes `node-1` to `node-3` on consecutive ports
pub fn three_node_cluster() -> Cluster {
    Cluster::new(
        "tc-cluster",
        vec![Stripe {
            nodes: (1..=3)
                .map(|i| Node::new(format!("node-{}", i), "localhost", 9410 + i as u16))
                .collect(),
        }],
    )
}

/// Two stripes of two nodes each: `node-1-1`, `node-1-2`, `node-2-1`, `node-2-2`
pub fn two_stripe_cluster() -> Cluster {
    Cluster::new(
        "tc-cluster",
        (1..=2)
            .map(|s| Stripe {
                nodes: (1..=2)
                    .map(|n| Node::new(format!("node-{}-{}", s, n), "localhost", 9400 + (s * 10 + n) as u16))
                    .collect(),
            })
            .collect(),
    )
}

/// A PREPARED request for a cluster-wide offheap change
pub fn prepared_request(
    change_id: &str,
    version: u64,
) -> ChangeRequest {
    ChangeRequest {
        change_id: change_id.to_string(),
        state: ChangeRequestState::Prepared,
        version,
        change: Change::set(Applicability::Cluster, "offheap-resources.main", "1GB"),
        result_hash: generate_hash(&format!("document-{}", version)),
        creation_host: TEST_HOST.to_string(),
        creation_user: TEST_USER.to_string(),
        creation_timestamp: version,
    }
}
