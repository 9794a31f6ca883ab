use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::error;
use tracing::info;

use super::fan_out;
use super::ChangeCoordinator;
use super::ConcurrencySizing;
use super::EndpointConnector;
use crate::ChangeEnvironment;
use crate::ChangeError;
use crate::CoordinatorConfig;
use crate::Result;

/// Builds [`ChangeCoordinator`]s over a node set.
pub struct CoordinatorFactory {
    connector: Arc<dyn EndpointConnector>,
    sizing: ConcurrencySizing,
    connect_timeout: Duration,
    request_timeout: Duration,
    environment: ChangeEnvironment,
}

impl CoordinatorFactory {
    pub fn new(
        connector: Arc<dyn EndpointConnector>,
        config: &CoordinatorConfig,
        environment: ChangeEnvironment,
    ) -> Self {
        Self {
            connector,
            sizing: ConcurrencySizing::from_config(config),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            environment,
        }
    }

    /// Connects to every address concurrently.
    ///
    /// Duplicate addresses are contacted once. Any connection that fails or
    /// exceeds the connect timeout fails the whole call, before any node has
    /// seen a prepare.
    pub async fn create_coordinator(
        &self,
        addresses: &[String],
    ) -> Result<ChangeCoordinator> {
        let mut seen = HashSet::new();
        let addresses: Vec<String> = addresses
            .iter()
            .filter(|address| seen.insert(address.as_str()))
            .cloned()
            .collect();
        if addresses.is_empty() {
            return Err(ChangeError::EmptyNodeSet.into());
        }

        debug!("connecting to {:?}", addresses);
        let calls = addresses
            .iter()
            .map(|address| {
                let connector = self.connector.clone();
                let target = address.clone();
                (address.clone(), async move { connector.connect(&target).await })
            })
            .collect();
        let results = fan_out::bounded(
            calls,
            self.sizing.threads_for(addresses.len()),
            self.connect_timeout,
            fan_out::connect_timeout,
        )
        .await;

        let mut endpoints = Vec::with_capacity(results.len());
        for (address, result) in addresses.iter().zip(results) {
            match result {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(e) => {
                    error!("failed to connect to {}: {}", address, e);
                    return Err(e);
                }
            }
        }

        info!("connected to {} nodes", endpoints.len());
        Ok(ChangeCoordinator::new(
            endpoints,
            self.sizing,
            self.request_timeout,
            self.environment.clone(),
        ))
    }
}
