use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::CommitMessage;
use crate::CommitResponse;
use crate::DiscoverResponse;
use crate::NodeState;
use crate::PrepareMessage;
use crate::PrepareResponse;
use crate::Result;
use crate::RollbackMessage;
use crate::RollbackResponse;

/// Administrative RPC surface of one node.
///
/// Transport failures surface as
/// [`NetworkError`](crate::NetworkError)s; protocol-level refusals of a
/// prepare come back as [`PrepareResponse::Rejected`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChangeEndpoint: Send + Sync + 'static {
    /// Address the endpoint was connected with
    fn address(&self) -> String;

    /// Snapshot of the node state and its latest change request
    async fn discover(&self) -> Result<DiscoverResponse>;

    async fn prepare(
        &self,
        message: PrepareMessage,
    ) -> Result<PrepareResponse>;

    async fn commit(
        &self,
        message: CommitMessage,
    ) -> Result<CommitResponse>;

    async fn rollback(
        &self,
        message: RollbackMessage,
    ) -> Result<RollbackResponse>;

    async fn current_version(&self) -> Result<u64>;

    async fn state(&self) -> Result<NodeState>;
}
