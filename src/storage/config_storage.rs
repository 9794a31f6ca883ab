use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tracing::error;

use crate::Error;
use crate::Result;

/// Version-keyed store of rendered configuration documents.
///
/// Versions are write-once. Backends report a version that was never saved
/// as [`StorageError::ConfigNotFound`](crate::StorageError::ConfigNotFound)
/// and a second save of the same version as
/// [`StorageError::ConfigVersionExists`](crate::StorageError::ConfigVersionExists).
#[cfg_attr(test, automock)]
pub trait ConfigStorage: Send + Sync + 'static {
    /// `Ok(None)` is reserved for version 0, see [`InitialConfigStorage`]
    fn get_config(
        &self,
        version: u64,
    ) -> Result<Option<String>>;

    fn save_config(
        &self,
        version: u64,
        document: &str,
    ) -> Result<()>;
}

impl<S: ConfigStorage + ?Sized> ConfigStorage for Arc<S> {
    fn get_config(
        &self,
        version: u64,
    ) -> Result<Option<String>> {
        self.as_ref().get_config(version)
    }

    fn save_config(
        &self,
        version: u64,
        document: &str,
    ) -> Result<()> {
        self.as_ref().save_config(version, document)
    }
}

/// Wraps a [`ConfigStorage`] so version 0 means "nothing stored yet".
///
/// Reading version 0 never reaches the inner store; saving it is a protocol
/// invariant violation.
pub struct InitialConfigStorage<S> {
    inner: S,
}

impl<S: ConfigStorage> InitialConfigStorage<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ConfigStorage> ConfigStorage for InitialConfigStorage<S> {
    fn get_config(
        &self,
        version: u64,
    ) -> Result<Option<String>> {
        if version == 0 {
            return Ok(None);
        }
        self.inner.get_config(version)
    }

    fn save_config(
        &self,
        version: u64,
        document: &str,
    ) -> Result<()> {
        if version == 0 {
            error!("refusing to save a configuration at version 0");
            return Err(Error::Fatal("attempted to save configuration at version 0".to_string()));
        }
        self.inner.save_config(version, document)
    }
}
