use tracing::debug;
use tracing::instrument;
use tracing::warn;

use super::CONFIG_STORAGE_NAMESPACE;
use crate::utils::convert::safe_kv;
use crate::utils::convert::safe_vk;
use crate::ConfigStorage;
use crate::ConvertError;
use crate::Result;
use crate::StorageError;

/// Configuration documents in the `config_storage` tree, keyed by
/// big-endian version
pub struct SledConfigStorage {
    tree: sled::Tree,
}

impl std::fmt::Debug for SledConfigStorage {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledConfigStorage").field("tree", &CONFIG_STORAGE_NAMESPACE).finish()
    }
}

impl SledConfigStorage {
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db.open_tree(CONFIG_STORAGE_NAMESPACE)?;
        Ok(Self { tree })
    }

    /// Highest version stored so far, 0 when empty
    pub fn last_version(&self) -> Result<u64> {
        match self.tree.last()? {
            Some((key, _)) => safe_vk(&key),
            None => Ok(0),
        }
    }
}

impl ConfigStorage for SledConfigStorage {
    #[instrument(skip(self))]
    fn get_config(
        &self,
        version: u64,
    ) -> Result<Option<String>> {
        match self.tree.get(safe_kv(version))? {
            Some(bytes) => {
                let document = String::from_utf8(bytes.to_vec())
                    .map_err(|e| ConvertError::ConversionFailure(e.to_string()))?;
                Ok(Some(document))
            }
            None => Err(StorageError::ConfigNotFound { version }.into()),
        }
    }

    #[instrument(skip(self, document))]
    fn save_config(
        &self,
        version: u64,
        document: &str,
    ) -> Result<()> {
        let swapped = self
            .tree
            .compare_and_swap(safe_kv(version), None as Option<&[u8]>, Some(document.as_bytes()))?;

        if swapped.is_err() {
            warn!("configuration version {} is already stored", version);
            return Err(StorageError::ConfigVersionExists { version }.into());
        }

        self.tree.flush()?;
        debug!("saved configuration version {} ({} bytes)", version, document.len());
        Ok(())
    }
}
