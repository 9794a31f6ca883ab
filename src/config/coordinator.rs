use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Parameters of the client-side change coordinator
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound for establishing a connection to one node
    ///
    /// Default: 10000
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Upper bound for one admin request to one node
    ///
    /// Default: 10000
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// Maximum number of nodes contacted at the same time
    ///
    /// Default: twice the available parallelism
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl CoordinatorConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_in_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "connect_timeout_in_ms must be greater than 0".into(),
            )));
        }

        if self.request_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "request_timeout_in_ms must be greater than 0".into(),
            )));
        }

        if self.max_concurrency == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_concurrency must be at least 1".into(),
            )));
        }

        Ok(())
    }
}

fn default_connect_timeout() -> u64 {
    10_000
}
fn default_request_timeout() -> u64 {
    10_000
}
fn default_max_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(1)
        .max(1)
}
