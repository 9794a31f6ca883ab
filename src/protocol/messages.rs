use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::Change;
use crate::ChangeRequest;
use crate::ChangeRequestState;
use crate::NodeState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareMessage {
    pub change_id: String,
    /// Version the change produces once committed
    pub version: u64,
    pub change: Change,
    pub host: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    pub change_id: String,
    pub host: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackMessage {
    pub change_id: String,
    pub host: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// A handler refused the change
    InvalidChange,
    /// The node already saw the proposed version or a higher one
    VersionConflict,
    /// The change does not fit the node's mode (activation vs settings)
    BadMode,
    /// A previous change is still prepared, or the change id was already used
    UnacceptableState,
}

impl fmt::Display for RejectionReason {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            RejectionReason::InvalidChange => "invalid change",
            RejectionReason::VersionConflict => "version conflict",
            RejectionReason::BadMode => "bad mode",
            RejectionReason::UnacceptableState => "unacceptable state",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub message: String,
}

impl Rejection {
    pub fn new(
        reason: RejectionReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrepareResponse {
    Accepted {
        change_id: String,
        version: u64,
        result_hash: String,
    },
    Rejected(Rejection),
}

impl PrepareResponse {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PrepareResponse::Accepted { .. })
    }

    pub fn result_hash(&self) -> Option<&str> {
        match self {
            PrepareResponse::Accepted { result_hash, .. } => Some(result_hash),
            PrepareResponse::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResponse {
    pub change_id: String,
    pub version: u64,
    pub requires_restart: bool,
    /// The change was committed by an earlier call; nothing was reapplied
    pub already_committed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackResponse {
    pub change_id: String,
    pub already_rolled_back: bool,
}

/// Public view of a persisted change request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDetails {
    pub change_id: String,
    pub state: ChangeRequestState,
    pub version: u64,
    pub summary: String,
    pub result_hash: String,
    pub creation_host: String,
    pub creation_user: String,
    pub creation_timestamp: u64,
}

impl From<&ChangeRequest> for ChangeDetails {
    fn from(request: &ChangeRequest) -> Self {
        Self {
            change_id: request.change_id.clone(),
            state: request.state,
            version: request.version,
            summary: request.change.summary(),
            result_hash: request.result_hash.clone(),
            creation_host: request.creation_host.clone(),
            creation_user: request.creation_user.clone(),
            creation_timestamp: request.creation_timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub node_name: String,
    pub stripe_id: usize,
    pub state: NodeState,
    pub latest_change: Option<ChangeDetails>,
    /// Hash of the document in effect, `None` before activation
    pub current_config_hash: Option<String>,
}

impl DiscoverResponse {
    /// The latest change if it is still waiting for a decision
    pub fn prepared_change(&self) -> Option<&ChangeDetails> {
        self.latest_change
            .as_ref()
            .filter(|details| details.state == ChangeRequestState::Prepared)
    }
}
