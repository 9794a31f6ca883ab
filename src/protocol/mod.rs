//! Transport-agnostic messages of the node administrative surface.
//!
//! Every message is serde-serializable so any transport can carry it; the
//! in-process [`LocalEndpoint`](crate::LocalEndpoint) passes them directly.

mod messages;

pub use messages::*;

#[cfg(test)]
mod messages_test;
