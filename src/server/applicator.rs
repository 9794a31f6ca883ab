use tracing::debug;
use tracing::error;
use tracing::warn;

use super::HandlerRegistry;
use crate::Change;
use crate::Cluster;
use crate::InvalidConfigChange;
use crate::NodeContext;
use crate::NodeIdentity;
use crate::Result;
use crate::SettingChange;
use crate::SettingName;

/// Verdict of a dry run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PotentialApplicationResult {
    /// The change is valid; carries the document it produces
    Allow(String),
    Reject(String),
}

impl PotentialApplicationResult {
    pub fn allow(document: impl Into<String>) -> Self {
        PotentialApplicationResult::Allow(document.into())
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        PotentialApplicationResult::Reject(reason.into())
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, PotentialApplicationResult::Allow(_))
    }
}

/// Turns a change into a new configuration document (prepare) and into live
/// side effects (commit).
pub trait ChangeApplicator: Send + Sync + 'static {
    /// Dry run against `existing`, `None` when nothing is stored yet.
    /// Never mutates live state.
    fn can_apply(
        &self,
        existing: Option<&str>,
        change: &Change,
    ) -> PotentialApplicationResult;

    /// Performs the live side effects of an accepted change.
    ///
    /// Returns whether a restart is needed for the change to take full effect.
    fn apply(
        &self,
        change: &Change,
    ) -> Result<bool>;

    /// Brings live subsystems in line with a stored document, at startup
    fn restore(
        &self,
        document: &str,
    ) -> Result<()>;
}

/// [`ChangeApplicator`] dispatching each atomic change to the handler of its
/// setting category.
#[derive(Debug)]
pub struct ConfigChangeApplicator {
    identity: NodeIdentity,
    registry: HandlerRegistry,
}

impl ConfigChangeApplicator {
    pub fn new(
        identity: NodeIdentity,
        registry: HandlerRegistry,
    ) -> Self {
        Self { identity, registry }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    fn try_activate(
        &self,
        existing: Option<&str>,
        cluster: &Cluster,
    ) -> std::result::Result<Cluster, InvalidConfigChange> {
        if existing.is_some() {
            return Err(InvalidConfigChange::new("Cluster is already activated"));
        }
        cluster.validate()?;
        if cluster.node(self.identity.stripe_id, &self.identity.node_name).is_none() {
            return Err(InvalidConfigChange::new(format!(
                "Node {} of stripe {} is not part of cluster {}",
                self.identity.node_name, self.identity.stripe_id, cluster.name
            )));
        }
        Ok(cluster.clone())
    }

    fn try_settings(
        &self,
        base: Cluster,
        changes: &[&SettingChange],
    ) -> std::result::Result<Cluster, InvalidConfigChange> {
        if changes.is_empty() {
            return Err(InvalidConfigChange::new("Change contains no setting"));
        }
        let mut context = NodeContext::new(base, self.identity.clone());
        for change in changes {
            context.cluster().check_applicability(change.applicability())?;
            let name = SettingName::parse(change.name())?;
            let handler = self.registry.handler(name.category).ok_or_else(|| {
                InvalidConfigChange::new(format!("No handler registered for setting {}", change.name()))
            })?;
            let next = handler.try_apply(&context, change)?;
            context = context.with_cluster(next);
        }
        Ok(context.into_cluster())
    }

    fn initialize_handlers(
        &self,
        cluster: Cluster,
    ) -> Result<()> {
        let context = NodeContext::new(cluster, self.identity.clone());
        for handler in self.registry.handlers() {
            handler.initialize(&context)?;
        }
        Ok(())
    }
}

impl ChangeApplicator for ConfigChangeApplicator {
    fn can_apply(
        &self,
        existing: Option<&str>,
        change: &Change,
    ) -> PotentialApplicationResult {
        let outcome = match change {
            Change::Activate { cluster } => self.try_activate(existing, cluster),
            _ => {
                let Some(document) = existing else {
                    return PotentialApplicationResult::reject("Node is not activated");
                };
                let base = match Cluster::parse(document) {
                    Ok(base) => base,
                    Err(e) => {
                        error!("Failed to parse existing configuration: {:?}", e);
                        return PotentialApplicationResult::reject("Internal error: parsing existing config");
                    }
                };
                self.try_settings(base, &change.setting_changes())
            }
        };

        let cluster = match outcome {
            Ok(cluster) => cluster,
            Err(e) => {
                warn!("rejecting change '{}': {}", change, e);
                return PotentialApplicationResult::reject(e.message());
            }
        };

        match cluster.render() {
            Ok(document) => PotentialApplicationResult::allow(document),
            Err(e) => {
                error!("Failed to render configuration for change '{}': {:?}", change, e);
                PotentialApplicationResult::reject("Internal error: rendering config")
            }
        }
    }

    fn apply(
        &self,
        change: &Change,
    ) -> Result<bool> {
        if let Change::Activate { cluster } = change {
            self.initialize_handlers(cluster.clone())?;
            return Ok(false);
        }

        let mut requires_restart = false;
        for setting in change.setting_changes() {
            if !setting.applicability().includes(&self.identity) {
                debug!("skipping '{}': not targeting this node", setting.summary());
                continue;
            }
            let name = SettingName::parse(setting.name())?;
            let handler = self.registry.handler(name.category).ok_or_else(|| {
                InvalidConfigChange::new(format!("No handler registered for setting {}", setting.name()))
            })?;
            requires_restart |= handler.apply(setting)?;
        }
        Ok(requires_restart)
    }

    fn restore(
        &self,
        document: &str,
    ) -> Result<()> {
        let cluster = Cluster::parse(document)?;
        self.initialize_handlers(cluster)
    }
}
