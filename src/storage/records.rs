use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::Change;
use crate::ChangeError;
use crate::Result;

/// Outcome state of one change attempt on one node.
///
/// `Prepared` moves exactly once to one of the two absorbing states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeRequestState {
    Prepared,
    Committed,
    RolledBack,
}

impl ChangeRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRequestState::Prepared => "PREPARED",
            ChangeRequestState::Committed => "COMMITTED",
            ChangeRequestState::RolledBack => "ROLLED_BACK",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChangeRequestState::Prepared)
    }

    /// Checks the `Prepared -> {Committed, RolledBack}` state machine
    pub fn ensure_transition(
        &self,
        change_id: &str,
        next: ChangeRequestState,
    ) -> Result<()> {
        match (self, next) {
            (ChangeRequestState::Prepared, ChangeRequestState::Committed)
            | (ChangeRequestState::Prepared, ChangeRequestState::RolledBack) => Ok(()),
            _ => Err(ChangeError::IllegalTransition {
                change_id: change_id.to_string(),
                from: self.as_str(),
                to: next.as_str(),
            }
            .into()),
        }
    }
}

impl fmt::Display for ChangeRequestState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMode {
    /// No topology installed yet; only activation is accepted
    #[default]
    Uninitialized,
    Accepting,
}

/// Persisted record of one change attempt, keyed by its change id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub change_id: String,
    pub state: ChangeRequestState,
    /// Version the change produces once committed
    pub version: u64,
    pub change: Change,
    /// sha256 of the document rendered at prepare time
    pub result_hash: String,
    pub creation_host: String,
    pub creation_user: String,
    /// Milliseconds since the unix epoch
    pub creation_timestamp: u64,
}

impl ChangeRequest {
    /// Copy of this record with only the state replaced
    pub(crate) fn transitioned(
        &self,
        next: ChangeRequestState,
    ) -> Result<ChangeRequest> {
        self.state.ensure_transition(&self.change_id, next)?;
        Ok(ChangeRequest {
            state: next,
            ..self.clone()
        })
    }
}

/// Per-node scalar bookkeeping.
///
/// `current_version <= highest_version` holds for every persisted value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub mode: ServerMode,
    pub current_version: u64,
    pub highest_version: u64,
    pub latest_change_id: Option<String>,
    pub last_mutation_host: Option<String>,
    pub last_mutation_user: Option<String>,
}

impl NodeState {
    pub fn is_consistent(&self) -> bool {
        self.current_version <= self.highest_version
    }
}
