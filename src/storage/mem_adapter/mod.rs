mod mem_change_state_store;
mod mem_config_storage;

pub use mem_change_state_store::*;
pub use mem_config_storage::*;
