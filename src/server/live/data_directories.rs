use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use tracing::info;

use crate::InvalidConfigChange;
use crate::Result;

/// Data directories known to the running node, by name
#[cfg_attr(test, automock)]
pub trait DataDirectories: Send + Sync + 'static {
    /// Checks that `name` could be registered at `path`
    fn validate_data_directory(
        &self,
        name: &str,
        path: &Path,
    ) -> std::result::Result<(), InvalidConfigChange>;

    /// Creates the directory if needed and registers it
    fn add_data_directory(
        &self,
        name: &str,
        path: &Path,
    ) -> Result<()>;

    fn data_directories(&self) -> BTreeMap<String, PathBuf>;
}

/// [`DataDirectories`] backed by the local filesystem.
///
/// Relative paths are resolved against `root`.
#[derive(Debug)]
pub struct LocalDataDirectories {
    root: PathBuf,
    directories: DashMap<String, PathBuf>,
}

impl LocalDataDirectories {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            directories: DashMap::new(),
        }
    }

    fn resolve(
        &self,
        path: &Path,
    ) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl DataDirectories for LocalDataDirectories {
    fn validate_data_directory(
        &self,
        name: &str,
        path: &Path,
    ) -> std::result::Result<(), InvalidConfigChange> {
        let resolved = self.resolve(path);

        if let Some(existing) = self.directories.get(name) {
            if *existing.value() != resolved {
                return Err(InvalidConfigChange::new(format!(
                    "Data directory {} is already registered at {}",
                    name,
                    existing.value().display()
                )));
            }
            return Ok(());
        }

        if let Some(other) = self
            .directories
            .iter()
            .find(|entry| *entry.value() == resolved)
        {
            return Err(InvalidConfigChange::new(format!(
                "Path {} is already used by data directory {}",
                resolved.display(),
                other.key()
            )));
        }

        if resolved.exists() && !resolved.is_dir() {
            return Err(InvalidConfigChange::new(format!(
                "Path {} exists and is not a directory",
                resolved.display()
            )));
        }
        Ok(())
    }

    fn add_data_directory(
        &self,
        name: &str,
        path: &Path,
    ) -> Result<()> {
        let resolved = self.resolve(path);
        std::fs::create_dir_all(&resolved).map_err(crate::StorageError::IoError)?;
        info!("registered data directory {} at {}", name, resolved.display());
        self.directories.insert(name.to_string(), resolved);
        Ok(())
    }

    fn data_directories(&self) -> BTreeMap<String, PathBuf> {
        self.directories
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
