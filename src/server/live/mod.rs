//! Running subsystems that handlers validate against and mutate on commit.

mod data_directories;
mod offheap_resources;

pub use data_directories::*;
pub use offheap_resources::*;
