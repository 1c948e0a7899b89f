//! Protocol and service error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Encoding errors for wire types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// CBOR encoding failed
    #[error("encode error: {0}")]
    Encode(String),

    /// CBOR decoding failed (truncated, malformed, or wrong shape)
    #[error("decode error: {0}")]
    Decode(String),
}

/// Errors reported by remote collaborators (board service, KMS, directory,
/// blob store).
///
/// These are the wire-level rejections; the client core maps them onto its own
/// taxonomy depending on which operation failed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceError {
    /// Requester is not authorized for the resource
    #[error("access denied: {reason}")]
    Denied {
        /// Why access was refused
        reason: String,
    },

    /// Resource does not exist (or no longer exists)
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// Channel is locked for deletion and rejects writes
    #[error("channel locked: {channel_id}")]
    Locked {
        /// Locked channel
        channel_id: String,
    },

    /// Channel is active and deletion was guarded
    #[error("channel active: {channel_id}")]
    Active {
        /// Active channel
        channel_id: String,
    },

    /// Request was malformed or violated a service limit
    #[error("invalid request: {reason}")]
    Invalid {
        /// What was wrong
        reason: String,
    },

    /// Collaborator failed internally
    #[error("service unavailable: {reason}")]
    Unavailable {
        /// Failure description
        reason: String,
    },
}

impl ServiceError {
    /// Access denied.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied { reason: reason.into() }
    }

    /// Resource not found.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Malformed request.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid { reason: reason.into() }
    }

    /// Internal collaborator failure.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }
}

impl From<ProtocolError> for ServiceError {
    fn from(err: ProtocolError) -> Self {
        Self::Invalid { reason: err.to_string() }
    }
}
