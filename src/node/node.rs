//! A running dconf node: its configuration and the [`ChangeServer`] that
//! answers the change protocol for it.

use std::sync::Arc;

use crate::ChangeServer;
use crate::DconfConfig;
use crate::NodeIdentity;

pub struct DconfNode {
    pub(super) config: Arc<DconfConfig>,
    pub(super) server: Arc<ChangeServer>,
}

impl DconfNode {
    pub fn config(&self) -> &DconfConfig {
        &self.config
    }

    pub fn server(&self) -> Arc<ChangeServer> {
        self.server.clone()
    }

    pub fn identity(&self) -> &NodeIdentity {
        self.server.identity()
    }

    /// Address the node is reachable on, `hostname:port`
    pub fn address(&self) -> String {
        self.config.node.address()
    }
}
