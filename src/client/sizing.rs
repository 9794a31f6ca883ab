use crate::CoordinatorConfig;

/// Number of nodes a coordinator talks to at once.
///
/// Grows with the node set but never beyond the configured cap, so a
/// 3-node cluster does not get the fan-out of a 100-node one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencySizing {
    max_concurrency: usize,
}

impl ConcurrencySizing {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(config.max_concurrency)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn threads_for(
        &self,
        node_count: usize,
    ) -> usize {
        node_count.clamp(1, self.max_concurrency)
    }
}
