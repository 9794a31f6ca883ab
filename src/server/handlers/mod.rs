mod data_dirs;
mod offheap_resources;

pub use data_dirs::*;
pub use offheap_resources::*;
