use std::collections::BTreeMap;
use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use super::Applicability;
use crate::server::InvalidConfigChange;
use crate::Result;

/// In-memory cluster topology, also the rendered configuration document.
///
/// Every node of a cluster stores the same rendering of this value, so it
/// must not carry anything node-local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub stripes: Vec<Stripe>,
    /// Cluster-wide offheap resources, in bytes
    #[serde(default)]
    pub offheap_resources: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stripe {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub hostname: String,
    pub port: u16,
    /// Data directory name -> path as configured (placeholders unresolved)
    #[serde(default)]
    pub data_dirs: BTreeMap<String, String>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        hostname: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            port,
            data_dirs: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

impl Cluster {
    pub fn new(
        name: impl Into<String>,
        stripes: Vec<Stripe>,
    ) -> Self {
        Self {
            name: name.into(),
            stripes,
            offheap_resources: BTreeMap::new(),
        }
    }

    /// Parses a rendered configuration document
    pub fn parse(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    /// Renders the configuration document. Rendering is deterministic:
    /// equal topologies always produce byte-identical documents.
    pub fn render(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn stripe(
        &self,
        stripe_id: usize,
    ) -> Option<&Stripe> {
        stripe_id.checked_sub(1).and_then(|i| self.stripes.get(i))
    }

    pub fn node(
        &self,
        stripe_id: usize,
        node_name: &str,
    ) -> Option<&Node> {
        self.stripe(stripe_id)
            .and_then(|stripe| stripe.nodes.iter().find(|n| n.name == node_name))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.stripes.iter().flat_map(|stripe| stripe.nodes.iter())
    }

    /// Nodes targeted by the applicability, with their stripe ids
    pub fn nodes_matching(
        &self,
        applicability: &Applicability,
    ) -> Vec<(usize, &Node)> {
        self.stripes
            .iter()
            .enumerate()
            .flat_map(|(i, stripe)| stripe.nodes.iter().map(move |node| (i + 1, node)))
            .filter(|(stripe_id, node)| applicability.targets(*stripe_id, &node.name))
            .collect()
    }

    /// Mutable access to every node targeted by the applicability.
    ///
    /// Meant for handlers working on their own copy of the topology.
    pub fn nodes_matching_mut(
        &mut self,
        applicability: &Applicability,
    ) -> Vec<&mut Node> {
        self.stripes
            .iter_mut()
            .enumerate()
            .flat_map(|(i, stripe)| stripe.nodes.iter_mut().map(move |node| (i + 1, node)))
            .filter(|(stripe_id, node)| applicability.targets(*stripe_id, &node.name))
            .map(|(_, node)| node)
            .collect()
    }

    /// Checks that the applicability names a stripe or node of this topology
    pub fn check_applicability(
        &self,
        applicability: &Applicability,
    ) -> std::result::Result<(), InvalidConfigChange> {
        match applicability {
            Applicability::Cluster => Ok(()),
            Applicability::Stripe { stripe_id } => self
                .stripe(*stripe_id)
                .map(|_| ())
                .ok_or_else(|| InvalidConfigChange::new(format!("Stripe {} does not exist", stripe_id))),
            Applicability::Node { stripe_id, node_name } => self
                .node(*stripe_id, node_name)
                .map(|_| ())
                .ok_or_else(|| {
                    InvalidConfigChange::new(format!("Node {} does not exist in stripe {}", node_name, stripe_id))
                }),
        }
    }

    /// Structural validation of a topology proposed for activation
    pub fn validate(&self) -> std::result::Result<(), InvalidConfigChange> {
        if self.name.trim().is_empty() {
            return Err(InvalidConfigChange::new("Cluster name cannot be empty"));
        }
        if self.stripes.is_empty() {
            return Err(InvalidConfigChange::new("Cluster must contain at least one stripe"));
        }

        let mut names = HashSet::new();
        let mut addresses = HashSet::new();
        for (i, stripe) in self.stripes.iter().enumerate() {
            if stripe.nodes.is_empty() {
                return Err(InvalidConfigChange::new(format!("Stripe {} has no nodes", i + 1)));
            }
            for node in &stripe.nodes {
                if !names.insert(node.name.as_str()) {
                    return Err(InvalidConfigChange::new(format!("Duplicate node name: {}", node.name)));
                }
                if !addresses.insert(node.address()) {
                    return Err(InvalidConfigChange::new(format!(
                        "Duplicate node address: {}",
                        node.address()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Location of the local node inside the topology
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub stripe_id: usize,
    pub node_name: String,
}

impl NodeIdentity {
    pub fn new(
        stripe_id: usize,
        node_name: impl Into<String>,
    ) -> Self {
        Self {
            stripe_id,
            node_name: node_name.into(),
        }
    }
}

/// A topology seen from one of its nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContext {
    cluster: Cluster,
    identity: NodeIdentity,
}

impl NodeContext {
    pub fn new(
        cluster: Cluster,
        identity: NodeIdentity,
    ) -> Self {
        Self { cluster, identity }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// The local node, if the topology knows about it
    pub fn node(&self) -> Option<&Node> {
        self.cluster.node(self.identity.stripe_id, &self.identity.node_name)
    }

    /// Replaces the topology, keeping the identity
    pub fn with_cluster(
        &self,
        cluster: Cluster,
    ) -> Self {
        Self {
            cluster,
            identity: self.identity.clone(),
        }
    }

    pub fn into_cluster(self) -> Cluster {
        self.cluster
    }
}
