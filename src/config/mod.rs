//! Layered node configuration.
//!
//! Values are merged from, in increasing priority:
//! - Type defaults
//! - The file named by `CONFIG_PATH`
//! - `DCONF__`-prefixed environment variables
mod coordinator;
mod node;
pub use coordinator::*;
pub use node::*;


use std::env;
use std::path::Path;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

const ENV_PREFIX: &str = "DCONF";

/// Configuration of one dconf node and of the coordinator it runs
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DconfConfig {
    /// Identity, endpoint and directories of the local node
    #[serde(default)]
    pub node: NodeConfig,

    /// Timeouts and fan-out limits of the change coordinator
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

impl DconfConfig {
    /// Loads configuration from defaults, `CONFIG_PATH` and the environment.
    ///
    /// Validation is deferred so further overrides can be layered with
    /// [`with_override_config`](Self::with_override_config). Callers must
    /// call [`validate`](Self::validate) before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("DCONF__NODE__NAME", "node-2");
    /// let cfg = DconfConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Layers `path` over the current values. Environment variables still win.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section, consuming and returning the configuration
    pub fn validate(self) -> Result<Self> {
        self.node.validate()?;
        self.coordinator.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

/// Ensures directory path is valid and writable
pub(super) fn validate_directory(
    path: &Path,
    name: &str,
) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::Config(ConfigError::Message(format!(
            "{name} path cannot be empty"
        ))));
    }

    #[cfg(not(test))]
    {
        use std::fs;
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| {
                Error::Config(ConfigError::Message(format!(
                    "Failed to create {} directory at {}: {}",
                    name,
                    path.display(),
                    e
                )))
            })?;
        }

        let test_file = path.join(".permission_test");
        fs::write(&test_file, b"test").map_err(|e| {
            Error::Config(ConfigError::Message(format!(
                "No write permission in {} directory {}: {}",
                name,
                path.display(),
                e
            )))
        })?;
        fs::remove_file(&test_file).ok();
    }

    Ok(())
}
