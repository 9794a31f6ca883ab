//! Client side of the change protocol
//!
//! Provides the components an administrative tool drives a cluster with:
//! - [`ChangeEndpoint`] - Admin RPC surface of one node
//! - [`EndpointConnector`] - Resolves node addresses to endpoints
//! - [`CoordinatorFactory`] - Connects to a node set and builds a coordinator
//! - [`ChangeCoordinator`] - Runs prepare/commit/rollback rounds and recovery
//! - [`LocalConnector`] - In-process transport over [`ChangeServer`](crate::ChangeServer)
//!
//! # Basic Usage
//! ```ignore
//! let factory = CoordinatorFactory::new(connector, &config.coordinator, ChangeEnvironment::from_env());
//! let coordinator = factory.create_coordinator(&addresses).await?;
//!
//! let outcome = coordinator
//!     .run_change(Change::set(Applicability::Cluster, "offheap-resources.main", "1GB"))
//!     .await?
//!     .into_result()?;
//! println!("committed version {}, restart needed: {}", outcome.version, outcome.requires_restart);
//! ```

mod connector;
mod coordinator;
mod endpoint;
mod factory;
mod fan_out;
mod local;
mod outcome;
mod sizing;

pub use connector::*;
pub use coordinator::*;
pub use endpoint::*;
pub use factory::*;
pub use local::*;
pub use outcome::*;
pub use sizing::*;
