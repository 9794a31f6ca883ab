use super::ChangeRequest;
use super::ChangeRequestState;
use super::NodeState;
use super::ServerMode;
use crate::Error;
use crate::Result;

/// One atomic write against a [`ChangeStateStore`](super::ChangeStateStore).
///
/// Built once through [`StateChangeBuilder`] and never modified afterwards.
/// Stores either persist all of it or none of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateChange {
    created: Vec<ChangeRequest>,
    transitions: Vec<(String, ChangeRequestState)>,
    mode: Option<ServerMode>,
    current_version: Option<u64>,
    highest_version: Option<u64>,
    latest_change_id: Option<String>,
    last_mutation: Option<(String, String)>,
}

impl StateChange {
    pub fn builder() -> StateChangeBuilder {
        StateChangeBuilder::default()
    }

    /// Change requests that must not exist yet
    pub fn created(&self) -> &[ChangeRequest] {
        &self.created
    }

    /// State updates of existing change requests, in order
    pub fn transitions(&self) -> &[(String, ChangeRequestState)] {
        &self.transitions
    }

    pub fn touches_node_state(&self) -> bool {
        self.mode.is_some()
            || self.current_version.is_some()
            || self.highest_version.is_some()
            || self.latest_change_id.is_some()
            || self.last_mutation.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.transitions.is_empty() && !self.touches_node_state()
    }

    /// Node state after this change, refusing results that break
    /// `current_version <= highest_version`
    pub(crate) fn merge_into(
        &self,
        base: &NodeState,
    ) -> Result<NodeState> {
        let mut next = base.clone();
        if let Some(mode) = self.mode {
            next.mode = mode;
        }
        if let Some(version) = self.current_version {
            next.current_version = version;
        }
        if let Some(version) = self.highest_version {
            next.highest_version = version;
        }
        if let Some(change_id) = &self.latest_change_id {
            next.latest_change_id = Some(change_id.clone());
        }
        if let Some((host, user)) = &self.last_mutation {
            next.last_mutation_host = Some(host.clone());
            next.last_mutation_user = Some(user.clone());
        }

        if !next.is_consistent() {
            return Err(Error::Fatal(format!(
                "current version {} would exceed highest version {}",
                next.current_version, next.highest_version
            )));
        }
        Ok(next)
    }
}

#[derive(Debug, Default)]
pub struct StateChangeBuilder {
    inner: StateChange,
}

impl StateChangeBuilder {
    pub fn create_change_request(
        mut self,
        request: ChangeRequest,
    ) -> Self {
        self.inner.created.push(request);
        self
    }

    pub fn update_change_request_state(
        mut self,
        change_id: impl Into<String>,
        state: ChangeRequestState,
    ) -> Self {
        self.inner.transitions.push((change_id.into(), state));
        self
    }

    pub fn mode(
        mut self,
        mode: ServerMode,
    ) -> Self {
        self.inner.mode = Some(mode);
        self
    }

    pub fn current_version(
        mut self,
        version: u64,
    ) -> Self {
        self.inner.current_version = Some(version);
        self
    }

    pub fn highest_version(
        mut self,
        version: u64,
    ) -> Self {
        self.inner.highest_version = Some(version);
        self
    }

    pub fn latest_change_id(
        mut self,
        change_id: impl Into<String>,
    ) -> Self {
        self.inner.latest_change_id = Some(change_id.into());
        self
    }

    pub fn last_mutation(
        mut self,
        host: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        self.inner.last_mutation = Some((host.into(), user.into()));
        self
    }

    pub fn build(self) -> StateChange {
        self.inner
    }
}
