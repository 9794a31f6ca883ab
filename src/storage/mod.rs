//! Durable per-node state of the change protocol.
//!
//! Two stores live side by side in one sled database:
//! - [`ConfigStorage`]: rendered configuration documents keyed by version
//! - [`ChangeStateStore`]: the change-request log and the [`NodeState`] record

mod change_state_store;
mod config_storage;
mod mem_adapter;
mod records;
mod sled_adapter;
mod state_change;


use std::path::Path;

pub use change_state_store::*;
pub use config_storage::*;
pub use mem_adapter::*;
pub use records::*;
pub use sled_adapter::*;
pub use state_change::*;
use tracing::debug;
use tracing::warn;

/// Opens the node database at `<root>/dconf`
pub fn init_sled_dconf_db(sled_db_root_path: impl AsRef<Path> + std::fmt::Debug) -> crate::Result<sled::Db> {
    debug!("init_sled_dconf_db from path: {:?}", &sled_db_root_path);

    let path = sled_db_root_path.as_ref();
    let db_path = path.join("dconf");

    let db = sled::Config::default()
        .path(&db_path)
        .cache_capacity(10 * 1024 * 1024) //10MB
        .use_compression(true)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            warn!("Try to open DB at this location: {:?} and failed: {:?}", db_path, e);
            e
        })?;
    Ok(db)
}
