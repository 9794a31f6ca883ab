use std::sync::Arc;

use tempfile::TempDir;

use super::TestNode;
use super::TEST_HOST;
use super::TEST_USER;
use crate::ChangeCoordinator;
use crate::ChangeEnvironment;
use crate::Cluster;
use crate::CoordinatorConfig;
use crate::CoordinatorFactory;
use crate::LocalConnector;
use crate::NodeIdentity;

/// One [`TestNode`] per node of a topology, registered with a
/// [`LocalConnector`] under the node's address
pub struct TestCluster {
    pub connector: Arc<LocalConnector>,
    pub nodes: Vec<TestNode>,
    pub addresses: Vec<String>,
    _data: TempDir,
}

impl TestCluster {
    /// Nodes are left uninitialized
    pub fn new(cluster: &Cluster) -> Self {
        let data = tempfile::tempdir().unwrap();
        let connector = Arc::new(LocalConnector::new());
        let mut nodes = Vec::new();
        let mut addresses = Vec::new();

        for (stripe_index, stripe) in cluster.stripes.iter().enumerate() {
            for node in &stripe.nodes {
                let identity = NodeIdentity::new(stripe_index + 1, node.name.clone());
                let root = data.path().join(format!("{}-{}", stripe_index + 1, node.name));
                let test_node = TestNode::new(identity, &root);
                connector.register(node.address(), test_node.server.clone());
                addresses.push(node.address());
                nodes.push(test_node);
            }
        }

        Self {
            connector,
            nodes,
            addresses,
            _data: data,
        }
    }

    /// Every node installs `cluster` at version 1
    pub fn activated(cluster: Cluster) -> Self {
        let test_cluster = Self::new(&cluster);
        for node in &test_cluster.nodes {
            node.activate(cluster.clone());
        }
        test_cluster
    }

    pub fn config() -> CoordinatorConfig {
        CoordinatorConfig {
            connect_timeout_in_ms: 1_000,
            request_timeout_in_ms: 1_000,
            max_concurrency: 2,
        }
    }

    pub fn factory(&self) -> CoordinatorFactory {
        CoordinatorFactory::new(
            self.connector.clone(),
            &Self::config(),
            ChangeEnvironment::new(TEST_HOST, TEST_USER),
        )
    }

    pub async fn coordinator(&self) -> ChangeCoordinator {
        self.factory().create_coordinator(&self.addresses).await.unwrap()
    }
}
