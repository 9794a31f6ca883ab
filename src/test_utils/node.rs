use std::path::Path;
use std::sync::Arc;

use crate::utils::substitutor::DefaultParameterSubstitutor;
use crate::utils::substitutor::ParameterSubstitutor;
use crate::Change;
use crate::ChangeServer;
use crate::Cluster;
use crate::CommitMessage;
use crate::CommitResponse;
use crate::ConfigChangeApplicator;
use crate::DataDirsConfigChangeHandler;
use crate::HandlerRegistry;
use crate::LocalDataDirectories;
use crate::LocalOffheapResources;
use crate::MemChangeStateStore;
use crate::MemConfigStorage;
use crate::NodeIdentity;
use crate::OffheapResourcesConfigChangeHandler;
use crate::PrepareMessage;
use crate::PrepareResponse;
use crate::Result;
use crate::RollbackMessage;
use crate::RollbackResponse;
use crate::SettingCategory;

use super::TEST_HOST;
use super::TEST_USER;

/// A [`ChangeServer`] on memory stores with both handlers wired to local
/// live subsystems
pub struct TestNode {
    pub server: Arc<ChangeServer>,
    pub config_storage: Arc<MemConfigStorage>,
    pub state_store: Arc<MemChangeStateStore>,
    pub data_directories: Arc<LocalDataDirectories>,
    pub offheap_resources: Arc<LocalOffheapResources>,
}

pub fn fixed_substitutor() -> Arc<dyn ParameterSubstitutor> {
    Arc::new(DefaultParameterSubstitutor::new(
        "host-a",
        "alice",
        "/home/alice",
        "/tmp",
    ))
}

pub fn registry_for(
    data_directories: Arc<LocalDataDirectories>,
    offheap_resources: Arc<LocalOffheapResources>,
) -> HandlerRegistry {
    HandlerRegistry::new()
        .with_handler(
            SettingCategory::DataDirs,
            Arc::new(DataDirsConfigChangeHandler::new(data_directories, fixed_substitutor())),
        )
        .with_handler(
            SettingCategory::OffheapResources,
            Arc::new(OffheapResourcesConfigChangeHandler::new(offheap_resources)),
        )
}

impl TestNode {
    pub fn new(
        identity: NodeIdentity,
        data_root: &Path,
    ) -> Self {
        Self::open(
            identity,
            data_root,
            Arc::new(MemConfigStorage::new()),
            Arc::new(MemChangeStateStore::new()),
        )
    }

    /// Opens a node over existing stores, as after a restart
    pub fn open(
        identity: NodeIdentity,
        data_root: &Path,
        config_storage: Arc<MemConfigStorage>,
        state_store: Arc<MemChangeStateStore>,
    ) -> Self {
        let data_directories = Arc::new(LocalDataDirectories::new(data_root));
        let offheap_resources = Arc::new(LocalOffheapResources::new());
        let applicator = ConfigChangeApplicator::new(
            identity.clone(),
            registry_for(data_directories.clone(), offheap_resources.clone()),
        );
        let server = ChangeServer::open(
            identity,
            config_storage.clone(),
            state_store.clone(),
            Arc::new(applicator),
        )
        .unwrap();

        Self {
            server: Arc::new(server),
            config_storage,
            state_store,
            data_directories,
            offheap_resources,
        }
    }

    pub fn prepare(
        &self,
        change_id: &str,
        version: u64,
        change: Change,
    ) -> Result<PrepareResponse> {
        self.server.prepare(PrepareMessage {
            change_id: change_id.to_string(),
            version,
            change,
            host: TEST_HOST.to_string(),
            user: TEST_USER.to_string(),
        })
    }

    pub fn commit(
        &self,
        change_id: &str,
    ) -> Result<CommitResponse> {
        self.server.commit(CommitMessage {
            change_id: change_id.to_string(),
            host: TEST_HOST.to_string(),
            user: TEST_USER.to_string(),
        })
    }

    pub fn rollback(
        &self,
        change_id: &str,
    ) -> Result<RollbackResponse> {
        self.server.rollback(RollbackMessage {
            change_id: change_id.to_string(),
            host: TEST_HOST.to_string(),
            user: TEST_USER.to_string(),
        })
    }

    /// Installs `cluster` at version 1
    pub fn activate(
        &self,
        cluster: Cluster,
    ) {
        let response = self.prepare("activation", 1, Change::activate(cluster)).unwrap();
        assert!(response.is_accepted(), "activation rejected: {:?}", response);
        self.commit("activation").unwrap();
    }
}
