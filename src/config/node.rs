use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use super::validate_directory;
use crate::Error;
use crate::NodeIdentity;
use crate::Result;

/// Local node parameters
///
/// Field-level defaults use helper functions prefixed with `default_`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NodeConfig {
    /// Node name, unique within its stripe
    ///
    /// Default: `node-1`
    #[serde(default = "default_name")]
    pub name: String,

    /// 1-based index of the stripe the node belongs to
    ///
    /// Default: 1
    #[serde(default = "default_stripe_id")]
    pub stripe_id: usize,

    /// Hostname other nodes and coordinators reach this node on
    ///
    /// Default: `localhost`
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Admin endpoint port
    ///
    /// Default: 9410
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root directory of the embedded database
    ///
    /// Default: `/tmp/dconf/db`
    #[serde(default = "default_db_dir")]
    pub db_root_dir: PathBuf,

    /// Log files output directory
    ///
    /// Default: `/tmp/dconf/logs`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Base that relative data directory paths are resolved against
    ///
    /// Default: `/tmp/dconf/data`
    #[serde(default = "default_data_dir_root")]
    pub data_dir_root: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            stripe_id: default_stripe_id(),
            hostname: default_hostname(),
            port: default_port(),
            db_root_dir: default_db_dir(),
            log_dir: default_log_dir(),
            data_dir_root: default_data_dir_root(),
        }
    }
}

impl NodeConfig {
    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity::new(self.stripe_id, self.name.clone())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// # Errors
    /// Returns `Error::Config` if any rule is violated
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message("node name cannot be empty".into())));
        }

        if self.stripe_id == 0 {
            return Err(Error::Config(ConfigError::Message(
                "stripe_id is 1-based and cannot be 0".into(),
            )));
        }

        if self.hostname.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message("hostname cannot be empty".into())));
        }

        if self.port == 0 {
            return Err(Error::Config(ConfigError::Message(
                "port must be non-zero".into(),
            )));
        }

        validate_directory(&self.db_root_dir, "db_root_dir")?;
        validate_directory(&self.log_dir, "log_dir")?;
        validate_directory(&self.data_dir_root, "data_dir_root")?;

        Ok(())
    }
}

fn default_name() -> String {
    "node-1".to_string()
}
fn default_stripe_id() -> usize {
    1
}
fn default_hostname() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    9410
}
fn default_db_dir() -> PathBuf {
    PathBuf::from("/tmp/dconf/db")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp/dconf/logs")
}
fn default_data_dir_root() -> PathBuf {
    PathBuf::from("/tmp/dconf/data")
}
