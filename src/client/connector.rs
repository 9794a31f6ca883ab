use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::ChangeEndpoint;
use crate::Result;

/// Resolves a node address into a connected [`ChangeEndpoint`]
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EndpointConnector: Send + Sync + 'static {
    async fn connect(
        &self,
        address: &str,
    ) -> Result<Arc<dyn ChangeEndpoint>>;
}
