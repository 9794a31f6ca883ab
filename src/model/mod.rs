//! Change-type model and in-memory cluster topology.
//!
//! A [`Change`] describes what an operator wants to mutate; a [`Cluster`] is
//! the topology the change is validated against and applied to. Both are plain
//! values: validation always produces a new [`Cluster`] instead of touching the
//! one it was handed.

mod change;
mod cluster;
mod setting;

pub use change::*;
pub use cluster::*;
pub use setting::*;
