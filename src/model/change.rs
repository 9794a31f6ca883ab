use serde::Deserialize;
use serde::Serialize;

use super::Cluster;
use super::NodeIdentity;

/// Scope targeted by a change.
///
/// Stripe ids are 1-based, matching the order of [`Cluster::stripes`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Applicability {
    Cluster,
    Stripe { stripe_id: usize },
    Node { stripe_id: usize, node_name: String },
}

impl Applicability {
    pub fn stripe(stripe_id: usize) -> Self {
        Applicability::Stripe { stripe_id }
    }

    pub fn node(
        stripe_id: usize,
        node_name: impl Into<String>,
    ) -> Self {
        Applicability::Node {
            stripe_id,
            node_name: node_name.into(),
        }
    }

    /// Whether the node with the given identity falls inside this scope
    pub fn includes(
        &self,
        identity: &NodeIdentity,
    ) -> bool {
        self.targets(identity.stripe_id, &identity.node_name)
    }

    pub fn targets(
        &self,
        stripe_id: usize,
        node_name: &str,
    ) -> bool {
        match self {
            Applicability::Cluster => true,
            Applicability::Stripe { stripe_id: s } => *s == stripe_id,
            Applicability::Node { stripe_id: s, node_name: n } => *s == stripe_id && n == node_name,
        }
    }
}

impl std::fmt::Display for Applicability {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Applicability::Cluster => write!(f, "cluster"),
            Applicability::Stripe { stripe_id } => write!(f, "stripe {}", stripe_id),
            Applicability::Node { stripe_id, node_name } => write!(f, "node {} of stripe {}", node_name, stripe_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingCommand {
    Set,
    Unset,
}

/// One atomic setting mutation.
///
/// `value` is present iff `command` is [`SettingCommand::Set`]; the constructors
/// and the deserializer both enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSettingChange")]
pub struct SettingChange {
    applicability: Applicability,
    command: SettingCommand,
    name: String,
    value: Option<String>,
}

#[derive(Deserialize)]
struct RawSettingChange {
    applicability: Applicability,
    command: SettingCommand,
    name: String,
    value: Option<String>,
}

impl TryFrom<RawSettingChange> for SettingChange {
    type Error = String;

    fn try_from(raw: RawSettingChange) -> std::result::Result<Self, Self::Error> {
        if raw.name.is_empty() {
            return Err("setting name cannot be empty".to_string());
        }
        match (raw.command, &raw.value) {
            (SettingCommand::Set, None) => Err(format!("set {} requires a value", raw.name)),
            (SettingCommand::Unset, Some(_)) => Err(format!("unset {} cannot carry a value", raw.name)),
            _ => Ok(SettingChange {
                applicability: raw.applicability,
                command: raw.command,
                name: raw.name,
                value: raw.value,
            }),
        }
    }
}

impl SettingChange {
    pub fn set(
        applicability: Applicability,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            applicability,
            command: SettingCommand::Set,
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn unset(
        applicability: Applicability,
        name: impl Into<String>,
    ) -> Self {
        Self {
            applicability,
            command: SettingCommand::Unset,
            name: name.into(),
            value: None,
        }
    }

    pub fn applicability(&self) -> &Applicability {
        &self.applicability
    }

    pub fn command(&self) -> SettingCommand {
        self.command
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn summary(&self) -> String {
        match (&self.command, &self.value) {
            (SettingCommand::Set, Some(value)) => format!("set {}={}", self.name, value),
            _ => format!("unset {}", self.name),
        }
    }
}

/// An immutable description of what an operator wants to change.
///
/// A [`Change::Multiple`] is applied as one unit: either every member is
/// accepted and applied in order, or none is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    Setting(SettingChange),
    Multiple(Vec<SettingChange>),
    /// Installs the first topology on nodes that have never been configured
    Activate { cluster: Cluster },
}

impl Change {
    pub fn set(
        applicability: Applicability,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Change::Setting(SettingChange::set(applicability, name, value))
    }

    pub fn unset(
        applicability: Applicability,
        name: impl Into<String>,
    ) -> Self {
        Change::Setting(SettingChange::unset(applicability, name))
    }

    pub fn activate(cluster: Cluster) -> Self {
        Change::Activate { cluster }
    }

    pub fn is_activation(&self) -> bool {
        matches!(self, Change::Activate { .. })
    }

    /// Expands a composite into its atomic members, in listed order
    pub fn setting_changes(&self) -> Vec<&SettingChange> {
        match self {
            Change::Setting(change) => vec![change],
            Change::Multiple(changes) => changes.iter().collect(),
            Change::Activate { .. } => Vec::new(),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Change::Activate { cluster } => format!("activate cluster {}", cluster.name),
            _ => self
                .setting_changes()
                .iter()
                .map(|c| c.summary())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl std::fmt::Display for Change {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}
