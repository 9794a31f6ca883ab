//! Server side of the change protocol.
//!
//! [`ChangeServer`] is the per-node state machine. It asks a
//! [`ChangeApplicator`] to dry-run changes at prepare time and to apply them
//! at commit time; the applicator dispatches every atomic setting change to
//! the [`ConfigChangeHandler`] registered for its category.

mod applicator;
mod change_server;
mod handler;
mod handlers;
mod live;

pub use applicator::*;
pub use change_server::*;
pub use handler::*;
pub use handlers::*;
pub use live::*;

#[cfg(test)]
mod handler_test;
