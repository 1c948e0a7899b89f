//! Storage error types.
//!
//! - `NotFound`: requested channel doesn't exist
//! - `Conflict`: sequence gap (sequencing violation)
//! - `Duplicate`: channel id already taken
//! - `Serialization`: failed to encode/decode data
//! - `Io`: underlying storage system errors

use lockboard_proto::ServiceError;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Channel not found
    #[error("channel not found: {channel_id}")]
    NotFound {
        /// Channel that was looked up
        channel_id: String,
    },

    /// Sequence conflict
    ///
    /// Occurs when a write does not start at the next free sequence number,
    /// for example after a concurrent writer got there first.
    #[error("sequence conflict: expected {expected}, got {got}")]
    Conflict {
        /// Next free sequence number
        expected: u64,
        /// Sequence number the write started at
        got: u64,
    },

    /// A channel with this id already exists
    #[error("duplicate channel: {channel_id}")]
    Duplicate {
        /// Colliding channel id
        channel_id: String,
    },

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { channel_id } => Self::NotFound { what: channel_id },
            other => Self::Unavailable { reason: other.to_string() },
        }
    }
}
