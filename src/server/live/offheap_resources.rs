use std::collections::BTreeMap;

use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use tracing::info;

use crate::InvalidConfigChange;
use crate::Result;

/// Offheap memory pools of the running node, sizes in bytes
#[cfg_attr(test, automock)]
pub trait OffheapResources: Send + Sync + 'static {
    fn size(
        &self,
        name: &str,
    ) -> Option<u64>;

    /// Bytes currently reserved from the pool
    fn used(
        &self,
        name: &str,
    ) -> Option<u64>;

    fn add_resource(
        &self,
        name: &str,
        size: u64,
    ) -> Result<()>;

    fn remove_resource(
        &self,
        name: &str,
    ) -> Result<()>;

    fn resources(&self) -> BTreeMap<String, u64>;
}

#[derive(Debug, Clone, Copy, Default)]
struct Pool {
    size: u64,
    used: u64,
}

/// In-process accounting of offheap pools
#[derive(Debug, Default)]
pub struct LocalOffheapResources {
    pools: DashMap<String, Pool>,
}

impl LocalOffheapResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `bytes` from a pool
    pub fn reserve(
        &self,
        name: &str,
        bytes: u64,
    ) -> std::result::Result<(), InvalidConfigChange> {
        let mut pool = self
            .pools
            .get_mut(name)
            .ok_or_else(|| InvalidConfigChange::new(format!("Unknown offheap resource: {}", name)))?;
        let used = pool.used.saturating_add(bytes);
        if used > pool.size {
            return Err(InvalidConfigChange::new(format!(
                "Offheap resource {} cannot fit {} more bytes",
                name, bytes
            )));
        }
        pool.used = used;
        Ok(())
    }

    pub fn release(
        &self,
        name: &str,
        bytes: u64,
    ) {
        if let Some(mut pool) = self.pools.get_mut(name) {
            pool.used = pool.used.saturating_sub(bytes);
        }
    }
}

impl OffheapResources for LocalOffheapResources {
    fn size(
        &self,
        name: &str,
    ) -> Option<u64> {
        self.pools.get(name).map(|pool| pool.size)
    }

    fn used(
        &self,
        name: &str,
    ) -> Option<u64> {
        self.pools.get(name).map(|pool| pool.used)
    }

    fn add_resource(
        &self,
        name: &str,
        size: u64,
    ) -> Result<()> {
        if self.pools.contains_key(name) {
            return Err(InvalidConfigChange::new(format!("Offheap resource {} already exists", name)).into());
        }
        info!("adding offheap resource {} of {} bytes", name, size);
        self.pools.insert(name.to_string(), Pool { size, used: 0 });
        Ok(())
    }

    fn remove_resource(
        &self,
        name: &str,
    ) -> Result<()> {
        match self.pools.remove_if(name, |_, pool| pool.used == 0) {
            Some(_) => {
                info!("removed offheap resource {}", name);
                Ok(())
            }
            None if self.pools.contains_key(name) => {
                Err(InvalidConfigChange::new(format!("Offheap resource {} is in use", name)).into())
            }
            None => Err(InvalidConfigChange::new(format!("Unknown offheap resource: {}", name)).into()),
        }
    }

    fn resources(&self) -> BTreeMap<String, u64> {
        self.pools
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().size))
            .collect()
    }
}
