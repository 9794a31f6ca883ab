use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::utils::measure::format_memory_size;
use crate::utils::measure::parse_memory_size;
use crate::Applicability;
use crate::Cluster;
use crate::ConfigChangeHandler;
use crate::InvalidConfigChange;
use crate::NodeContext;
use crate::OffheapResources;
use crate::Result;
use crate::SettingChange;
use crate::SettingCommand;
use crate::SettingName;

/// Handles cluster-wide `offheap-resources.<name>` settings.
///
/// - SET of a new resource adds it live
/// - SET of an existing resource must grow it; growth needs a restart
/// - UNSET removes an unused resource; unknown resources are rejected
pub struct OffheapResourcesConfigChangeHandler {
    offheap_resources: Arc<dyn OffheapResources>,
}

impl OffheapResourcesConfigChangeHandler {
    pub fn new(offheap_resources: Arc<dyn OffheapResources>) -> Self {
        Self { offheap_resources }
    }

    fn requested_size(change: &SettingChange) -> std::result::Result<Option<u64>, InvalidConfigChange> {
        match (change.command(), change.value()) {
            (SettingCommand::Set, Some(value)) => parse_memory_size(value).map(Some),
            _ => Ok(None),
        }
    }
}

impl ConfigChangeHandler for OffheapResourcesConfigChangeHandler {
    fn try_apply(
        &self,
        base: &NodeContext,
        change: &SettingChange,
    ) -> std::result::Result<Cluster, InvalidConfigChange> {
        let name = SettingName::parse(change.name())?;
        if *change.applicability() != Applicability::Cluster {
            return Err(InvalidConfigChange::new(format!(
                "Setting {} can only be changed cluster-wide, not for {}",
                name,
                change.applicability()
            )));
        }

        let mut cluster = base.cluster().clone();
        let existing = cluster.offheap_resources.get(&name.key).copied();

        match (Self::requested_size(change)?, existing) {
            (Some(size), None) => {
                cluster.offheap_resources.insert(name.key, size);
            }
            (Some(size), Some(current)) if size > current => {
                cluster.offheap_resources.insert(name.key, size);
            }
            (Some(size), Some(current)) if size == current => {
                debug!("offheap resource {} already has size {}", name.key, size);
            }
            (Some(size), Some(current)) => {
                return Err(InvalidConfigChange::new(format!(
                    "Offheap resource {} cannot shrink from {} to {}",
                    name.key,
                    format_memory_size(current),
                    format_memory_size(size)
                )));
            }
            (None, None) => {
                return Err(InvalidConfigChange::new(format!(
                    "Offheap resource {} does not exist",
                    name.key
                )));
            }
            (None, Some(_)) => {
                let used = self.offheap_resources.used(&name.key).unwrap_or(0);
                if used > 0 {
                    return Err(InvalidConfigChange::new(format!(
                        "Offheap resource {} is in use ({} reserved)",
                        name.key,
                        format_memory_size(used)
                    )));
                }
                cluster.offheap_resources.remove(&name.key);
            }
        }
        Ok(cluster)
    }

    fn apply(
        &self,
        change: &SettingChange,
    ) -> Result<bool> {
        let name = SettingName::parse(change.name())?;
        let live = self.offheap_resources.size(&name.key);

        match (Self::requested_size(change)?, live) {
            (Some(size), None) => {
                self.offheap_resources.add_resource(&name.key, size)?;
                Ok(false)
            }
            (Some(size), Some(current)) if size > current => {
                info!(
                    "offheap resource {} grows from {} to {} after restart",
                    name.key,
                    format_memory_size(current),
                    format_memory_size(size)
                );
                Ok(true)
            }
            (Some(_), Some(_)) => Ok(false),
            (None, Some(_)) => {
                self.offheap_resources.remove_resource(&name.key)?;
                Ok(false)
            }
            (None, None) => Ok(false),
        }
    }

    fn initialize(
        &self,
        context: &NodeContext,
    ) -> Result<()> {
        for (name, size) in &context.cluster().offheap_resources {
            if self.offheap_resources.size(name).is_none() {
                self.offheap_resources.add_resource(name, *size)?;
            }
        }
        Ok(())
    }
}
