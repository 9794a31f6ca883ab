// Submodule declaration
// -----------------------------------------------------------------------------
mod sled_change_state_store;
mod sled_config_storage;


// Re-export
// -----------------------------------------------------------------------------
pub use sled_change_state_store::*;
pub use sled_config_storage::*;
// -----------------------------------------------------------------------------
// Database namespaces
/// Sled database tree namespaces
pub(crate) const CONFIG_STORAGE_NAMESPACE: &str = "config_storage";
pub(crate) const CHANGE_STATE_NAMESPACE: &str = "change_state";

pub(crate) const NODE_STATE_KEY: &[u8] = b"node_state";
pub(crate) const CHANGE_REQUEST_PREFIX: &[u8] = b"change/";
