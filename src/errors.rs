//! Configuration Change Protocol Error Hierarchy
//!
//! Defines the error types for the two-phase configuration change protocol,
//! categorized by layer: infrastructure (network, storage, serialization),
//! configuration loading, and the change protocol itself.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

use crate::server::InvalidConfigChange;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (network, storage, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Node configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Change protocol violations and rejections
    #[error(transparent)]
    Change(#[from] ChangeError),

    /// Protocol invariant violations. Never retried.
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Per-node request exceeded the configured request timeout
    #[error("Request to {endpoint} timed out after {duration:?}")]
    Timeout { endpoint: String, duration: Duration },

    /// Connection could not be established within the connect timeout
    #[error("Connecting to {endpoint} timed out after {duration:?}")]
    ConnectTimeout { endpoint: String, duration: Duration },

    /// Node could not be reached at all
    #[error("Endpoint {endpoint} unreachable: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Serialization failures for persisted records
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    /// Requested configuration version was never stored
    #[error("No configuration stored at version {version}")]
    ConfigNotFound { version: u64 },

    /// Configuration versions are write-once
    #[error("Configuration version {version} already exists")]
    ConfigVersionExists { version: u64 },

    /// State update referenced a change request that was never created
    #[error("Change request {change_id} not found")]
    ChangeRequestNotFound { change_id: String },

    /// Value convert failed
    #[error("Value convert failed")]
    Convert(#[from] ConvertError),
}

/// Error type for value conversion operations
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// This occurs when the input byte slice length doesn't match the required 8 bytes.
    #[error("invalid byte length: expected 8 bytes, received {0} bytes")]
    InvalidLength(usize),

    #[error("conversion failure: {0}")]
    ConversionFailure(String),
}

// Serialization is classified separately (rendered documents cross both protocol and storage)
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Bincode serialization failed: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Document serialization failed: {0}")]
    Document(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ChangeError {
    /// A handler refused the proposed setting change
    #[error(transparent)]
    InvalidConfigChange(#[from] InvalidConfigChange),

    /// The node has already seen a version at or above the proposed one
    #[error("Version conflict: proposed version {proposed} but highest version is {highest}")]
    VersionConflict { proposed: u64, highest: u64 },

    /// Change request state machine violation, e.g. COMMITTED -> ROLLED_BACK
    #[error("Change {change_id} cannot move from {from} to {to}")]
    IllegalTransition {
        change_id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("Unknown change {0}")]
    UnknownChange(String),

    /// Re-rendered document no longer matches the hash recorded at prepare time
    #[error("Change {change_id} diverged: expected hash {expected}, found {actual}")]
    Divergence {
        change_id: String,
        expected: String,
        actual: String,
    },

    /// Nodes disagree on which configuration is in effect
    #[error("Cluster is inconsistent: {0}")]
    InconsistentCluster(String),

    /// The coordinator could not get every node to accept the change
    #[error("Change {change_id} was not committed: {details}")]
    Rejected { change_id: String, details: String },

    #[error("No nodes to drive the change against")]
    EmptyNodeSet,
}

// ============== Conversion Implementations ============== //
impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::System(SystemError::Network(e))
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<ConvertError> for Error {
    fn from(e: ConvertError) -> Self {
        Error::System(SystemError::Storage(StorageError::Convert(e)))
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<InvalidConfigChange> for Error {
    fn from(e: InvalidConfigChange) -> Self {
        Error::Change(ChangeError::InvalidConfigChange(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        SerializationError::Document(e).into()
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        StorageError::BincodeError(e).into()
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        NetworkError::TaskFailed(err).into()
    }
}

impl Error {
    /// Whether this error came from a handler or protocol rejection rather than infrastructure
    pub fn is_invalid_change(&self) -> bool {
        matches!(self, Error::Change(ChangeError::InvalidConfigChange(_)))
    }
}
