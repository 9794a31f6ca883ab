use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::ChangeApplicator;
use super::PotentialApplicationResult;
use crate::metrics::COMMIT_TOTAL;
use crate::metrics::PREPARE_TOTAL;
use crate::metrics::RESULT_ACCEPTED;
use crate::metrics::RESULT_FAILED;
use crate::metrics::RESULT_OK;
use crate::metrics::RESULT_REJECTED;
use crate::metrics::RESULT_REPEATED;
use crate::metrics::ROLLBACK_TOTAL;
use crate::utils::hash::generate_hash;
use crate::Change;
use crate::ChangeDetails;
use crate::ChangeError;
use crate::ChangeRequest;
use crate::ChangeRequestState;
use crate::ChangeStateStore;
use crate::Cluster;
use crate::CommitMessage;
use crate::CommitResponse;
use crate::ConfigStorage;
use crate::DiscoverResponse;
use crate::Error;
use crate::InitialConfigStorage;
use crate::NodeIdentity;
use crate::NodeState;
use crate::PrepareMessage;
use crate::PrepareResponse;
use crate::Rejection;
use crate::RejectionReason;
use crate::Result;
use crate::RollbackMessage;
use crate::RollbackResponse;
use crate::ServerMode;
use crate::StateChange;
use crate::StorageError;
use crate::SystemError;

/// Per-node side of the change protocol.
///
/// Mutating calls are serialized by a single writer lock, so two concurrent
/// prepares can never claim the same version. The live topology is only
/// ever replaced, on commit.
pub struct ChangeServer {
    identity: NodeIdentity,
    config_storage: InitialConfigStorage<Arc<dyn ConfigStorage>>,
    state_store: Arc<dyn ChangeStateStore>,
    applicator: Arc<dyn ChangeApplicator>,
    topology: ArcSwapOption<Cluster>,
    /// Documents rendered at prepare time, by change id
    pending: DashMap<String, String>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for ChangeServer {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ChangeServer")
            .field("identity", &self.identity)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl ChangeServer {
    /// Loads the persisted state and brings the live subsystems in line with
    /// the document in effect
    pub fn open(
        identity: NodeIdentity,
        config_storage: Arc<dyn ConfigStorage>,
        state_store: Arc<dyn ChangeStateStore>,
        applicator: Arc<dyn ChangeApplicator>,
    ) -> Result<Self> {
        let config_storage = InitialConfigStorage::new(config_storage);
        let state = state_store.node_state()?;
        if !state.is_consistent() {
            return Err(Error::Fatal(format!(
                "persisted node state is inconsistent: current version {} > highest version {}",
                state.current_version, state.highest_version
            )));
        }

        let topology = match config_storage.get_config(state.current_version)? {
            Some(document) => {
                applicator.restore(&document)?;
                Some(Arc::new(Cluster::parse(&document)?))
            }
            None => None,
        };

        info!(
            "change server for node {} opened at version {} (highest {}, mode {:?})",
            identity.node_name, state.current_version, state.highest_version, state.mode
        );

        Ok(Self {
            identity,
            config_storage,
            state_store,
            applicator,
            topology: ArcSwapOption::new(topology),
            pending: DashMap::new(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Topology currently in effect, `None` before activation
    pub fn topology(&self) -> Option<Arc<Cluster>> {
        self.topology.load_full()
    }

    pub fn current_version(&self) -> Result<u64> {
        Ok(self.state_store.node_state()?.current_version)
    }

    pub fn state(&self) -> Result<NodeState> {
        self.state_store.node_state()
    }

    pub fn change_history(&self) -> Result<Vec<ChangeDetails>> {
        Ok(self
            .state_store
            .change_history()?
            .iter()
            .map(ChangeDetails::from)
            .collect())
    }

    /// Document stored at `version`; `None` for version 0
    pub fn config(
        &self,
        version: u64,
    ) -> Result<Option<String>> {
        self.config_storage.get_config(version)
    }

    #[instrument(skip(self))]
    pub fn discover(&self) -> Result<DiscoverResponse> {
        let state = self.state_store.node_state()?;
        let latest_change = match &state.latest_change_id {
            Some(change_id) => self.state_store.change_request(change_id)?.as_ref().map(ChangeDetails::from),
            None => None,
        };
        let current_config_hash = self
            .config_storage
            .get_config(state.current_version)?
            .map(|document| generate_hash(&document));

        Ok(DiscoverResponse {
            node_name: self.identity.node_name.clone(),
            stripe_id: self.identity.stripe_id,
            state,
            latest_change,
            current_config_hash,
        })
    }

    #[instrument(skip(self, message), fields(change_id = %message.change_id, version = message.version))]
    pub fn prepare(
        &self,
        message: PrepareMessage,
    ) -> Result<PrepareResponse> {
        let _guard = self.write_lock.lock();

        let result = self.prepare_locked(message);
        let label = match &result {
            Ok(PrepareResponse::Accepted { .. }) => RESULT_ACCEPTED,
            Ok(PrepareResponse::Rejected(_)) => RESULT_REJECTED,
            Err(_) => RESULT_FAILED,
        };
        PREPARE_TOTAL.with_label_values(&[label]).inc();
        result
    }

    fn prepare_locked(
        &self,
        message: PrepareMessage,
    ) -> Result<PrepareResponse> {
        let state = self.state_store.node_state()?;

        if let Some(rejection) = self.check_preconditions(&state, &message)? {
            warn!("rejecting prepare of {}: {}", message.change_id, rejection);
            return Ok(PrepareResponse::Rejected(rejection));
        }

        let existing = self.config_storage.get_config(state.current_version)?;
        let document = match self.applicator.can_apply(existing.as_deref(), &message.change) {
            PotentialApplicationResult::Allow(document) => document,
            PotentialApplicationResult::Reject(reason) => {
                return Ok(PrepareResponse::Rejected(Rejection::new(
                    RejectionReason::InvalidChange,
                    reason,
                )));
            }
        };

        let result_hash = generate_hash(&document);
        let request = ChangeRequest {
            change_id: message.change_id.clone(),
            state: ChangeRequestState::Prepared,
            version: message.version,
            change: message.change,
            result_hash: result_hash.clone(),
            creation_host: message.host,
            creation_user: message.user,
            creation_timestamp: now_millis(),
        };

        self.state_store.apply(
            StateChange::builder()
                .create_change_request(request)
                .highest_version(message.version)
                .latest_change_id(message.change_id.clone())
                .build(),
        )?;
        self.pending.insert(message.change_id.clone(), document);

        debug!("prepared {} for version {}", message.change_id, message.version);
        Ok(PrepareResponse::Accepted {
            change_id: message.change_id,
            version: message.version,
            result_hash,
        })
    }

    fn check_preconditions(
        &self,
        state: &NodeState,
        message: &PrepareMessage,
    ) -> Result<Option<Rejection>> {
        if self.state_store.change_request(&message.change_id)?.is_some() {
            return Ok(Some(Rejection::new(
                RejectionReason::UnacceptableState,
                format!("Change id {} was already used", message.change_id),
            )));
        }

        if message.version <= state.highest_version {
            return Ok(Some(Rejection::new(
                RejectionReason::VersionConflict,
                ChangeError::VersionConflict {
                    proposed: message.version,
                    highest: state.highest_version,
                }
                .to_string(),
            )));
        }

        if let Some(latest_id) = &state.latest_change_id {
            if let Some(latest) = self.state_store.change_request(latest_id)? {
                if latest.state == ChangeRequestState::Prepared {
                    return Ok(Some(Rejection::new(
                        RejectionReason::UnacceptableState,
                        format!("Change {} is still prepared and must be committed or rolled back first", latest_id),
                    )));
                }
            }
        }

        match (state.mode, &message.change) {
            (ServerMode::Accepting, Change::Activate { .. }) => Ok(Some(Rejection::new(
                RejectionReason::BadMode,
                "Node is already activated",
            ))),
            (ServerMode::Uninitialized, change) if !change.is_activation() => Ok(Some(Rejection::new(
                RejectionReason::BadMode,
                "Node is not activated; the first change must be an activation",
            ))),
            _ => Ok(None),
        }
    }

    #[instrument(skip(self, message), fields(change_id = %message.change_id))]
    pub fn commit(
        &self,
        message: CommitMessage,
    ) -> Result<CommitResponse> {
        let _guard = self.write_lock.lock();

        let result = self.commit_locked(message);
        let label = match &result {
            Ok(response) if response.already_committed => RESULT_REPEATED,
            Ok(_) => RESULT_OK,
            Err(_) => RESULT_FAILED,
        };
        COMMIT_TOTAL.with_label_values(&[label]).inc();
        result
    }

    fn commit_locked(
        &self,
        message: CommitMessage,
    ) -> Result<CommitResponse> {
        let request = self.find_request(&message.change_id)?;

        match request.state {
            ChangeRequestState::Committed => {
                debug!("{} is already committed", request.change_id);
                return Ok(CommitResponse {
                    change_id: request.change_id,
                    version: request.version,
                    requires_restart: false,
                    already_committed: true,
                });
            }
            ChangeRequestState::RolledBack => {
                request.state.ensure_transition(&request.change_id, ChangeRequestState::Committed)?;
            }
            ChangeRequestState::Prepared => {}
        }

        let document = self.prepared_document(&request)?;
        let requires_restart = self.applicator.apply(&request.change)?;

        match self.config_storage.save_config(request.version, &document) {
            Ok(()) => {}
            Err(Error::System(SystemError::Storage(StorageError::ConfigVersionExists { version }))) => {
                self.ensure_stored_document_matches(&request, version)?;
            }
            Err(e) => return Err(e),
        }

        self.state_store.apply(
            StateChange::builder()
                .update_change_request_state(request.change_id.clone(), ChangeRequestState::Committed)
                .current_version(request.version)
                .mode(ServerMode::Accepting)
                .last_mutation(message.host, message.user)
                .build(),
        )?;

        self.topology.store(Some(Arc::new(Cluster::parse(&document)?)));
        self.pending.remove(&request.change_id);

        info!(
            "committed {} ({}) at version {}",
            request.change_id,
            request.change.summary(),
            request.version
        );
        Ok(CommitResponse {
            change_id: request.change_id,
            version: request.version,
            requires_restart,
            already_committed: false,
        })
    }

    /// The document rendered at prepare time; re-rendered and checked against
    /// the recorded hash when the node restarted in between
    fn prepared_document(
        &self,
        request: &ChangeRequest,
    ) -> Result<String> {
        if let Some(document) = self.pending.get(&request.change_id) {
            return Ok(document.value().clone());
        }

        let state = self.state_store.node_state()?;
        let existing = self.config_storage.get_config(state.current_version)?;
        let document = match self.applicator.can_apply(existing.as_deref(), &request.change) {
            PotentialApplicationResult::Allow(document) => document,
            PotentialApplicationResult::Reject(reason) => {
                return Err(ChangeError::Rejected {
                    change_id: request.change_id.clone(),
                    details: reason,
                }
                .into());
            }
        };

        let actual = generate_hash(&document);
        if actual != request.result_hash {
            return Err(ChangeError::Divergence {
                change_id: request.change_id.clone(),
                expected: request.result_hash.clone(),
                actual,
            }
            .into());
        }
        Ok(document)
    }

    fn ensure_stored_document_matches(
        &self,
        request: &ChangeRequest,
        version: u64,
    ) -> Result<()> {
        let stored = self
            .config_storage
            .get_config(version)?
            .map(|document| generate_hash(&document))
            .unwrap_or_default();
        if stored != request.result_hash {
            return Err(ChangeError::Divergence {
                change_id: request.change_id.clone(),
                expected: request.result_hash.clone(),
                actual: stored,
            }
            .into());
        }
        warn!("version {} was already stored with the expected document", version);
        Ok(())
    }

    #[instrument(skip(self, message), fields(change_id = %message.change_id))]
    pub fn rollback(
        &self,
        message: RollbackMessage,
    ) -> Result<RollbackResponse> {
        let _guard = self.write_lock.lock();

        let result = self.rollback_locked(message);
        let label = match &result {
            Ok(response) if response.already_rolled_back => RESULT_REPEATED,
            Ok(_) => RESULT_OK,
            Err(_) => RESULT_FAILED,
        };
        ROLLBACK_TOTAL.with_label_values(&[label]).inc();
        result
    }

    fn rollback_locked(
        &self,
        message: RollbackMessage,
    ) -> Result<RollbackResponse> {
        let request = self.find_request(&message.change_id)?;

        match request.state {
            ChangeRequestState::RolledBack => {
                return Ok(RollbackResponse {
                    change_id: request.change_id,
                    already_rolled_back: true,
                });
            }
            ChangeRequestState::Committed => {
                request.state.ensure_transition(&request.change_id, ChangeRequestState::RolledBack)?;
            }
            ChangeRequestState::Prepared => {}
        }

        self.state_store.apply(
            StateChange::builder()
                .update_change_request_state(request.change_id.clone(), ChangeRequestState::RolledBack)
                .build(),
        )?;
        self.pending.remove(&request.change_id);

        info!(
            "rolled back {} (version {} stays reserved) on behalf of {}@{}",
            request.change_id, request.version, message.user, message.host
        );
        Ok(RollbackResponse {
            change_id: request.change_id,
            already_rolled_back: false,
        })
    }

    fn find_request(
        &self,
        change_id: &str,
    ) -> Result<ChangeRequest> {
        self.state_store
            .change_request(change_id)?
            .ok_or_else(|| ChangeError::UnknownChange(change_id.to_string()).into())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
