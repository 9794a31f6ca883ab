//! A builder for assembling a [`DconfNode`] from a [`DconfConfig`].
//!
//! ## Key Design Points
//! - **Default Components**: sled-backed stores under `db_root_dir`, data directories resolved
//!   against `data_dir_root`, in-process offheap accounting and the environment-driven parameter
//!   substitutor.
//! - **Customization**: every component can be overridden with a setter (e.g.
//!   `config_storage()`, `offheap_resources()`), and further setting categories registered with
//!   `handler()`.
//!
//! ## Example
//! ```ignore
//! let node = NodeBuilder::new(Some("config/node-2.toml"))?
//!     .offheap_resources(my_pools)
//!     .build()?;
//! connector.register(node.address(), node.server());
//! ```

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use super::DconfNode;
use crate::init_metrics;
use crate::init_sled_dconf_db;
use crate::utils::substitutor::DefaultParameterSubstitutor;
use crate::utils::substitutor::ParameterSubstitutor;
use crate::ChangeServer;
use crate::ChangeStateStore;
use crate::ConfigChangeApplicator;
use crate::ConfigChangeHandler;
use crate::ConfigStorage;
use crate::DataDirectories;
use crate::DataDirsConfigChangeHandler;
use crate::DconfConfig;
use crate::HandlerRegistry;
use crate::LocalDataDirectories;
use crate::LocalOffheapResources;
use crate::OffheapResources;
use crate::OffheapResourcesConfigChangeHandler;
use crate::Result;
use crate::SettingCategory;
use crate::SledChangeStateStore;
use crate::SledConfigStorage;

pub struct NodeBuilder {
    pub(super) config: DconfConfig,
    pub(super) config_storage: Option<Arc<dyn ConfigStorage>>,
    pub(super) state_store: Option<Arc<dyn ChangeStateStore>>,
    pub(super) substitutor: Option<Arc<dyn ParameterSubstitutor>>,
    pub(super) data_directories: Option<Arc<dyn DataDirectories>>,
    pub(super) offheap_resources: Option<Arc<dyn OffheapResources>>,
    pub(super) handlers: HandlerRegistry,
}

impl NodeBuilder {
    /// Loads configuration from defaults, `CONFIG_PATH` and the environment,
    /// then layers `override_path` if given
    pub fn new(override_path: Option<&str>) -> Result<Self> {
        let mut config = DconfConfig::new()?;
        if let Some(path) = override_path {
            info!("with_override_config from: {}", path);
            config = config.with_override_config(path)?;
        }
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: DconfConfig) -> Self {
        Self {
            config,
            config_storage: None,
            state_store: None,
            substitutor: None,
            data_directories: None,
            offheap_resources: None,
            handlers: HandlerRegistry::new(),
        }
    }

    pub fn config_storage(
        mut self,
        config_storage: Arc<dyn ConfigStorage>,
    ) -> Self {
        self.config_storage = Some(config_storage);
        self
    }

    pub fn state_store(
        mut self,
        state_store: Arc<dyn ChangeStateStore>,
    ) -> Self {
        self.state_store = Some(state_store);
        self
    }

    pub fn parameter_substitutor(
        mut self,
        substitutor: Arc<dyn ParameterSubstitutor>,
    ) -> Self {
        self.substitutor = Some(substitutor);
        self
    }

    pub fn data_directories(
        mut self,
        data_directories: Arc<dyn DataDirectories>,
    ) -> Self {
        self.data_directories = Some(data_directories);
        self
    }

    pub fn offheap_resources(
        mut self,
        offheap_resources: Arc<dyn OffheapResources>,
    ) -> Self {
        self.offheap_resources = Some(offheap_resources);
        self
    }

    /// Registers a handler for `category`, taking precedence over the built-in one
    pub fn handler(
        mut self,
        category: SettingCategory,
        handler: Arc<dyn ConfigChangeHandler>,
    ) -> Self {
        self.handlers.register(category, handler);
        self
    }

    /// Validates the configuration and assembles the node.
    ///
    /// Opens the sled database only if one of the stores was not supplied.
    pub fn build(self) -> Result<DconfNode> {
        let config = self.config.validate()?;
        init_metrics();

        let (config_storage, state_store) = match (self.config_storage, self.state_store) {
            (Some(config_storage), Some(state_store)) => (config_storage, state_store),
            (config_storage, state_store) => {
                let db = init_sled_dconf_db(&config.node.db_root_dir)?;
                let config_storage = match config_storage {
                    Some(config_storage) => config_storage,
                    None => Arc::new(SledConfigStorage::new(&db)?) as Arc<dyn ConfigStorage>,
                };
                let state_store = match state_store {
                    Some(state_store) => state_store,
                    None => Arc::new(SledChangeStateStore::new(&db)?) as Arc<dyn ChangeStateStore>,
                };
                (config_storage, state_store)
            }
        };

        let substitutor = self
            .substitutor
            .unwrap_or_else(|| Arc::new(DefaultParameterSubstitutor::from_env()));
        let data_directories = self
            .data_directories
            .unwrap_or_else(|| Arc::new(LocalDataDirectories::new(config.node.data_dir_root.clone())));
        let offheap_resources = self
            .offheap_resources
            .unwrap_or_else(|| Arc::new(LocalOffheapResources::new()));

        let mut registry = HandlerRegistry::new()
            .with_handler(
                SettingCategory::DataDirs,
                Arc::new(DataDirsConfigChangeHandler::new(data_directories, substitutor)),
            )
            .with_handler(
                SettingCategory::OffheapResources,
                Arc::new(OffheapResourcesConfigChangeHandler::new(offheap_resources)),
            );
        for category in self.handlers.categories() {
            if let Some(handler) = self.handlers.handler(category) {
                debug!("overriding handler for {}", category.as_str());
                registry.register(category, handler.clone());
            }
        }

        let identity = config.node.identity();
        let applicator = ConfigChangeApplicator::new(identity.clone(), registry);
        let server = ChangeServer::open(identity, config_storage, state_store, Arc::new(applicator))?;
        info!("node {} ready on {}", config.node.name, config.node.address());

        Ok(DconfNode {
            config: Arc::new(config),
            server: Arc::new(server),
        })
    }
}
