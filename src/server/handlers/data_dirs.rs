use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::utils::substitutor::ParameterSubstitutor;
use crate::Cluster;
use crate::ConfigChangeHandler;
use crate::DataDirectories;
use crate::InvalidConfigChange;
use crate::NodeContext;
use crate::Result;
use crate::SettingChange;
use crate::SettingName;

/// Handles `data-dirs.<name>` settings.
///
/// Directories can be added to any node scope. Moving or removing an
/// existing directory is refused.
pub struct DataDirsConfigChangeHandler {
    data_directories: Arc<dyn DataDirectories>,
    substitutor: Arc<dyn ParameterSubstitutor>,
}

impl DataDirsConfigChangeHandler {
    pub fn new(
        data_directories: Arc<dyn DataDirectories>,
        substitutor: Arc<dyn ParameterSubstitutor>,
    ) -> Self {
        Self {
            data_directories,
            substitutor,
        }
    }

    fn path_of<'a>(
        name: &SettingName,
        change: &'a SettingChange,
    ) -> std::result::Result<&'a str, InvalidConfigChange> {
        match change.value() {
            Some(path) if !path.trim().is_empty() => Ok(path),
            Some(_) => Err(InvalidConfigChange::new(format!("Data directory {} needs a path", name.key))),
            None => Err(InvalidConfigChange::new(format!(
                "Unsupported operation: {} (data directories cannot be removed)",
                change.summary()
            ))),
        }
    }
}

impl ConfigChangeHandler for DataDirsConfigChangeHandler {
    fn try_apply(
        &self,
        base: &NodeContext,
        change: &SettingChange,
    ) -> std::result::Result<Cluster, InvalidConfigChange> {
        let name = SettingName::parse(change.name())?;
        let path = Self::path_of(&name, change)?;

        let local_needs_directory = change.applicability().includes(base.identity())
            && base
                .node()
                .map(|node| !node.data_dirs.contains_key(&name.key))
                .unwrap_or(false);
        if local_needs_directory {
            let resolved = self.substitutor.substitute(path);
            self.data_directories
                .validate_data_directory(&name.key, Path::new(&resolved))?;
        }

        let mut cluster = base.cluster().clone();
        let targeted = cluster.nodes_matching_mut(change.applicability());
        if targeted.is_empty() {
            return Err(InvalidConfigChange::new(format!(
                "No node matches {}",
                change.applicability()
            )));
        }

        for node in targeted {
            match node.data_dirs.get(&name.key) {
                Some(existing) if existing != path => {
                    return Err(InvalidConfigChange::new(format!(
                        "Data directory {} of node {} is already set to {}; moving data directories is not supported",
                        name.key, node.name, existing
                    )));
                }
                Some(_) => debug!("data directory {} already set on node {}", name.key, node.name),
                None => {
                    let resolved = self.substitutor.substitute(path);
                    if let Some(other) = node
                        .data_dirs
                        .iter()
                        .find(|(_, existing)| self.substitutor.substitute(existing) == resolved)
                        .map(|(other, _)| other)
                    {
                        return Err(InvalidConfigChange::new(format!(
                            "Path {} is already used by data directory {} of node {}",
                            resolved, other, node.name
                        )));
                    }
                    node.data_dirs.insert(name.key.clone(), path.to_string());
                }
            }
        }
        Ok(cluster)
    }

    fn apply(
        &self,
        change: &SettingChange,
    ) -> Result<bool> {
        let name = SettingName::parse(change.name())?;
        let path = Self::path_of(&name, change)?;

        if self.data_directories.data_directories().contains_key(&name.key) {
            debug!("data directory {} is already registered", name.key);
            return Ok(false);
        }

        let resolved = self.substitutor.substitute(path);
        self.data_directories
            .add_data_directory(&name.key, Path::new(&resolved))?;
        Ok(false)
    }

    fn initialize(
        &self,
        context: &NodeContext,
    ) -> Result<()> {
        let Some(node) = context.node() else {
            return Ok(());
        };

        let live = self.data_directories.data_directories();
        for (name, path) in &node.data_dirs {
            if live.contains_key(name) {
                continue;
            }
            let resolved = self.substitutor.substitute(path);
            self.data_directories.add_data_directory(name, Path::new(&resolved))?;
        }
        info!("data directories initialized for node {}", node.name);
        Ok(())
    }
}
