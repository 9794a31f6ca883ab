//! Fixtures shared by the unit tests of every module
mod cluster;
mod common;
mod node;

pub use cluster::*;
pub use common::*;
pub use node::*;
