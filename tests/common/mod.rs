use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use dconf::ChangeCoordinator;
use dconf::ChangeEndpoint;
use dconf::ChangeEnvironment;
use dconf::ChangeServer;
use dconf::Cluster;
use dconf::CommitMessage;
use dconf::CommitResponse;
use dconf::CoordinatorConfig;
use dconf::CoordinatorFactory;
use dconf::DataDirectories;
use dconf::DconfConfig;
use dconf::DconfNode;
use dconf::DefaultParameterSubstitutor;
use dconf::DiscoverResponse;
use dconf::EndpointConnector;
use dconf::LocalConnector;
use dconf::NetworkError;
use dconf::Node;
use dconf::NodeBuilder;
use dconf::NodeState;
use dconf::PrepareMessage;
use dconf::PrepareResponse;
use dconf::Result;
use dconf::RollbackMessage;
use dconf::RollbackResponse;
use dconf::Stripe;
use tempfile::TempDir;

pub const ADMIN_HOST: &str = "ops-host";
pub const ADMIN_USER: &str = "operator";

const NODE_COUNT: usize = 3;
const PORT_BASE: u16 = 9510;

pub fn topology() -> Cluster {
    Cluster::new(
        "it-cluster",
        vec![Stripe {
            nodes: (1..=NODE_COUNT)
                .map(|i| Node::new(format!("node-{}", i), "localhost", PORT_BASE + i as u16))
                .collect(),
        }],
    )
}

fn coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig {
        connect_timeout_in_ms: 1_000,
        request_timeout_in_ms: 1_000,
        max_concurrency: 2,
    }
}

fn node_config(
    root: &Path,
    index: usize,
) -> DconfConfig {
    let mut config = DconfConfig::default();
    config.node.name = format!("node-{}", index);
    config.node.stripe_id = 1;
    config.node.hostname = "localhost".to_string();
    config.node.port = PORT_BASE + index as u16;
    config.node.db_root_dir = root.join(format!("node-{}", index)).join("db");
    config.node.log_dir = root.join(format!("node-{}", index)).join("logs");
    config.node.data_dir_root = root.join(format!("node-{}", index)).join("data");
    config
}

/// Three sled-backed nodes registered with one [`LocalConnector`]
pub struct TestContext {
    pub connector: Arc<LocalConnector>,
    pub nodes: Vec<DconfNode>,
    pub addresses: Vec<String>,
    root: TempDir,
}

impl TestContext {
    pub fn start() -> Self {
        Self::start_with(|_| None)
    }

    /// `live_dirs(i)` may supply the live data directories of node `i` (1-based)
    pub fn start_with<F>(live_dirs: F) -> Self
    where
        F: Fn(usize) -> Option<Arc<dyn DataDirectories>>,
    {
        let root = tempfile::tempdir().unwrap();
        let connector = Arc::new(LocalConnector::new());
        let mut nodes = Vec::new();
        let mut addresses = Vec::new();

        for index in 1..=NODE_COUNT {
            let node = build_node(root.path(), index, live_dirs(index));
            connector.register(node.address(), node.server());
            addresses.push(node.address());
            nodes.push(node);
        }

        Self {
            connector,
            nodes,
            addresses,
            root,
        }
    }

    pub fn server(
        &self,
        index: usize,
    ) -> Arc<ChangeServer> {
        self.nodes[index].server()
    }

    pub fn factory(
        &self,
        connector: Arc<dyn EndpointConnector>,
    ) -> CoordinatorFactory {
        CoordinatorFactory::new(
            connector,
            &coordinator_config(),
            ChangeEnvironment::new(ADMIN_HOST, ADMIN_USER),
        )
    }

    pub async fn coordinator(&self) -> ChangeCoordinator {
        self.factory(self.connector.clone())
            .create_coordinator(&self.addresses)
            .await
            .unwrap()
    }

    /// Installs [`topology`] at version 1 on every node
    pub async fn activate(&self) {
        let outcome = self
            .coordinator()
            .await
            .run_change(dconf::Change::activate(topology()))
            .await
            .unwrap();
        assert!(outcome.is_committed(), "activation failed: {:?}", outcome);
    }

    /// Drops node `index` (0-based) and reopens it over the same database
    pub fn restart(
        &mut self,
        index: usize,
    ) {
        self.connector.remove(&self.addresses[index]);
        let placeholder = build_detached(self.root.path(), index + 1);
        drop(std::mem::replace(&mut self.nodes[index], placeholder));

        let node = build_node(self.root.path(), index + 1, None);
        self.connector.register(node.address(), node.server());
        self.nodes[index] = node;
    }

    pub fn current_versions(&self) -> Vec<u64> {
        self.nodes
            .iter()
            .map(|node| node.server().current_version().unwrap())
            .collect()
    }

    pub fn documents(
        &self,
        version: u64,
    ) -> Vec<Option<String>> {
        self.nodes
            .iter()
            .map(|node| node.server().config(version).unwrap())
            .collect()
    }
}

fn substitutor(root: &Path) -> Arc<DefaultParameterSubstitutor> {
    Arc::new(DefaultParameterSubstitutor::new(
        "it-host",
        ADMIN_USER,
        root.join("home"),
        root.join("tmp"),
    ))
}

fn build_node(
    root: &Path,
    index: usize,
    live_dirs: Option<Arc<dyn DataDirectories>>,
) -> DconfNode {
    let mut builder = NodeBuilder::from_config(node_config(root, index)).parameter_substitutor(substitutor(root));
    if let Some(live_dirs) = live_dirs {
        builder = builder.data_directories(live_dirs);
    }
    builder.build().unwrap()
}

/// Memory-backed stand-in holding a slot while the real node is reopened
fn build_detached(
    root: &Path,
    index: usize,
) -> DconfNode {
    NodeBuilder::from_config(node_config(root, index))
        .config_storage(Arc::new(dconf::MemConfigStorage::new()))
        .state_store(Arc::new(dconf::MemChangeStateStore::new()))
        .parameter_substitutor(substitutor(root))
        .build()
        .unwrap()
}

/// [`EndpointConnector`] whose endpoints fail commits sent to blocked addresses
pub struct CommitDroppingConnector {
    inner: Arc<LocalConnector>,
    blocked: Arc<DashSet<String>>,
}

impl CommitDroppingConnector {
    pub fn new(inner: Arc<LocalConnector>) -> Self {
        Self {
            inner,
            blocked: Arc::new(DashSet::new()),
        }
    }

    pub fn block_commits_to(
        &self,
        address: &str,
    ) {
        self.blocked.insert(address.to_string());
    }
}

#[async_trait]
impl EndpointConnector for CommitDroppingConnector {
    async fn connect(
        &self,
        address: &str,
    ) -> Result<Arc<dyn ChangeEndpoint>> {
        let inner = self.inner.connect(address).await?;
        Ok(Arc::new(CommitDroppingEndpoint {
            inner,
            blocked: self.blocked.clone(),
        }))
    }
}

struct CommitDroppingEndpoint {
    inner: Arc<dyn ChangeEndpoint>,
    blocked: Arc<DashSet<String>>,
}

#[async_trait]
impl ChangeEndpoint for CommitDroppingEndpoint {
    fn address(&self) -> String {
        self.inner.address()
    }

    async fn discover(&self) -> Result<DiscoverResponse> {
        self.inner.discover().await
    }

    async fn prepare(
        &self,
        message: PrepareMessage,
    ) -> Result<PrepareResponse> {
        self.inner.prepare(message).await
    }

    async fn commit(
        &self,
        message: CommitMessage,
    ) -> Result<CommitResponse> {
        let address = self.inner.address();
        if self.blocked.contains(&address) {
            return Err(NetworkError::Unreachable {
                endpoint: address,
                reason: "connection lost before commit".to_string(),
            }
            .into());
        }
        self.inner.commit(message).await
    }

    async fn rollback(
        &self,
        message: RollbackMessage,
    ) -> Result<RollbackResponse> {
        self.inner.rollback(message).await
    }

    async fn current_version(&self) -> Result<u64> {
        self.inner.current_version().await
    }

    async fn state(&self) -> Result<NodeState> {
        self.inner.state().await
    }
}
