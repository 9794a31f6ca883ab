use std::collections::HashMap;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::Cluster;
use crate::NodeContext;
use crate::Result;
use crate::SettingCategory;
use crate::SettingChange;

/// Validation failure of a proposed setting change.
///
/// The message is reported to the operator verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidConfigChange {
    message: String,
}

impl InvalidConfigChange {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Validator and mutator for one [`SettingCategory`].
#[cfg_attr(test, automock)]
pub trait ConfigChangeHandler: Send + Sync + 'static {
    /// Returns the topology with `change` applied.
    ///
    /// Works on a copy; `base` and every live subsystem stay untouched.
    fn try_apply(
        &self,
        base: &NodeContext,
        change: &SettingChange,
    ) -> std::result::Result<Cluster, InvalidConfigChange>;

    /// Performs the live side effects of a change `try_apply` accepted.
    ///
    /// Returns whether the node must restart for the change to take full effect.
    fn apply(
        &self,
        change: &SettingChange,
    ) -> Result<bool>;

    /// Brings the live subsystem in line with a topology installed by
    /// activation or loaded at startup
    fn initialize(
        &self,
        _context: &NodeContext,
    ) -> Result<()> {
        Ok(())
    }
}

/// Category to handler table, filled once at startup
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<SettingCategory, Arc<dyn ConfigChangeHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let mut categories = self.categories();
        categories.sort();
        f.debug_struct("HandlerRegistry").field("categories", &categories).finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `category`, replacing any previous one
    pub fn register(
        &mut self,
        category: SettingCategory,
        handler: Arc<dyn ConfigChangeHandler>,
    ) -> Option<Arc<dyn ConfigChangeHandler>> {
        self.handlers.insert(category, handler)
    }

    pub fn with_handler(
        mut self,
        category: SettingCategory,
        handler: Arc<dyn ConfigChangeHandler>,
    ) -> Self {
        self.register(category, handler);
        self
    }

    pub fn handler(
        &self,
        category: SettingCategory,
    ) -> Option<&Arc<dyn ConfigChangeHandler>> {
        self.handlers.get(&category)
    }

    pub fn categories(&self) -> Vec<SettingCategory> {
        self.handlers.keys().copied().collect()
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn ConfigChangeHandler>> {
        self.handlers.values()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
