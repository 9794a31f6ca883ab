//! Durable, versioned configuration changes for a cluster of nodes.
//!
//! Every node runs a [`ChangeServer`] over its own [`ConfigStorage`] and
//! [`ChangeStateStore`]. An administrative tool drives changes across the
//! nodes with a [`ChangeCoordinator`]: a change is prepared everywhere, then
//! committed everywhere, or rolled back wherever it was accepted.

mod client;
mod config;
mod environment;
mod errors;
mod metrics;
mod model;
mod node;
mod protocol;
mod server;
mod storage;
pub mod utils;

pub use client::*;
pub use config::*;
pub use environment::*;
pub use errors::*;
pub use metrics::*;
pub use model::*;
pub use node::*;
pub use protocol::*;
pub use server::*;
pub use storage::*;
pub use utils::substitutor::DefaultParameterSubstitutor;
pub use utils::substitutor::ParameterSubstitutor;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
