#[cfg(test)]
use mockall::automock;

use super::ChangeRequest;
use super::NodeState;
use super::StateChange;
use crate::Result;

/// Durable change-request log plus the node-state record of one node.
///
/// Only the owning node process reads or writes it.
#[cfg_attr(test, automock)]
pub trait ChangeStateStore: Send + Sync + 'static {
    /// Returns the default (uninitialized, version 0) state on a fresh store
    fn node_state(&self) -> Result<NodeState>;

    fn change_request(
        &self,
        change_id: &str,
    ) -> Result<Option<ChangeRequest>>;

    /// Every change request ever recorded, ordered by version
    fn change_history(&self) -> Result<Vec<ChangeRequest>>;

    /// Persists the whole change atomically.
    ///
    /// Fails without writing anything if a created request already exists,
    /// a transition targets an unknown request or breaks the request state
    /// machine, or the resulting node state is inconsistent.
    fn apply(
        &self,
        change: StateChange,
    ) -> Result<()>;

    fn flush(&self) -> Result<()>;
}
