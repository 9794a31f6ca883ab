use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::ConfigStorage;
use crate::Result;
use crate::StorageError;

/// Non-durable [`ConfigStorage`], for tests and throwaway nodes
#[derive(Debug, Default)]
pub struct MemConfigStorage {
    documents: DashMap<u64, String>,
}

impl MemConfigStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl ConfigStorage for MemConfigStorage {
    fn get_config(
        &self,
        version: u64,
    ) -> Result<Option<String>> {
        self.documents
            .get(&version)
            .map(|document| Some(document.value().clone()))
            .ok_or_else(|| StorageError::ConfigNotFound { version }.into())
    }

    fn save_config(
        &self,
        version: u64,
        document: &str,
    ) -> Result<()> {
        match self.documents.entry(version) {
            Entry::Occupied(_) => Err(StorageError::ConfigVersionExists { version }.into()),
            Entry::Vacant(slot) => {
                slot.insert(document.to_string());
                debug!("saved configuration version {} in memory", version);
                Ok(())
            }
        }
    }
}
