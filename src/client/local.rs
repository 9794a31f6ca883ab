use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::ChangeEndpoint;
use super::EndpointConnector;
use crate::ChangeServer;
use crate::CommitMessage;
use crate::CommitResponse;
use crate::DiscoverResponse;
use crate::NetworkError;
use crate::NodeState;
use crate::PrepareMessage;
use crate::PrepareResponse;
use crate::Result;
use crate::RollbackMessage;
use crate::RollbackResponse;

/// [`ChangeEndpoint`] calling a [`ChangeServer`] living in the same process.
///
/// The shared reachability flag lets callers cut the node off between two
/// calls, the way a network partition would.
pub struct LocalEndpoint {
    address: String,
    server: Arc<ChangeServer>,
    reachable: Arc<AtomicBool>,
}

impl LocalEndpoint {
    pub fn new(
        address: impl Into<String>,
        server: Arc<ChangeServer>,
        reachable: Arc<AtomicBool>,
    ) -> Self {
        Self {
            address: address.into(),
            server,
            reachable,
        }
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.reachable.load(Ordering::Acquire) {
            return Ok(());
        }
        debug!("{} is unreachable", self.address);
        Err(NetworkError::Unreachable {
            endpoint: self.address.clone(),
            reason: "connection refused".to_string(),
        }
        .into())
    }
}

#[async_trait]
impl ChangeEndpoint for LocalEndpoint {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn discover(&self) -> Result<DiscoverResponse> {
        self.ensure_reachable()?;
        self.server.discover()
    }

    async fn prepare(
        &self,
        message: PrepareMessage,
    ) -> Result<PrepareResponse> {
        self.ensure_reachable()?;
        self.server.prepare(message)
    }

    async fn commit(
        &self,
        message: CommitMessage,
    ) -> Result<CommitResponse> {
        self.ensure_reachable()?;
        self.server.commit(message)
    }

    async fn rollback(
        &self,
        message: RollbackMessage,
    ) -> Result<RollbackResponse> {
        self.ensure_reachable()?;
        self.server.rollback(message)
    }

    async fn current_version(&self) -> Result<u64> {
        self.ensure_reachable()?;
        self.server.current_version()
    }

    async fn state(&self) -> Result<NodeState> {
        self.ensure_reachable()?;
        self.server.state()
    }
}

struct LocalNode {
    server: Arc<ChangeServer>,
    reachable: Arc<AtomicBool>,
}

/// [`EndpointConnector`] over an address book of in-process servers
#[derive(Default)]
pub struct LocalConnector {
    nodes: DashMap<String, LocalNode>,
}

impl LocalConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `server` under `address`, reachable, replacing any previous entry
    pub fn register(
        &self,
        address: impl Into<String>,
        server: Arc<ChangeServer>,
    ) {
        self.nodes.insert(
            address.into(),
            LocalNode {
                server,
                reachable: Arc::new(AtomicBool::new(true)),
            },
        );
    }

    /// Applies to endpoints already handed out as well as future connections.
    /// Returns false for an unknown address.
    pub fn set_reachable(
        &self,
        address: &str,
        reachable: bool,
    ) -> bool {
        match self.nodes.get(address) {
            Some(node) => {
                node.reachable.store(reachable, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn remove(
        &self,
        address: &str,
    ) -> bool {
        self.nodes.remove(address).is_some()
    }
}

#[async_trait]
impl EndpointConnector for LocalConnector {
    async fn connect(
        &self,
        address: &str,
    ) -> Result<Arc<dyn ChangeEndpoint>> {
        let Some(node) = self.nodes.get(address) else {
            return Err(NetworkError::Unreachable {
                endpoint: address.to_string(),
                reason: "no node registered at this address".to_string(),
            }
            .into());
        };
        if !node.reachable.load(Ordering::Acquire) {
            return Err(NetworkError::Unreachable {
                endpoint: address.to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        Ok(Arc::new(LocalEndpoint::new(
            address,
            node.server.clone(),
            node.reachable.clone(),
        )))
    }
}
