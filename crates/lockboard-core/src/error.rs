//! Error taxonomy for board operations.
//!
//! Collaborators reject requests with [`ServiceError`]; the client maps those
//! onto [`BoardError`] depending on which step failed, so the same KMS denial
//! surfaces as `KeyUnavailable` when writing and `DecryptionDenied` when
//! reading.

use lockboard_crypto::CryptoError;
use lockboard_proto::{ProtocolError, ServiceError};
use thiserror::Error;

/// Errors returned by board operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// No key could be resolved for a channel's KMS resource
    #[error("key unavailable for {resource}: {reason}")]
    KeyUnavailable {
        /// Resource or key URL that failed to resolve
        resource: String,
        /// Collaborator's reason
        reason: String,
    },

    /// Requester may not decrypt data sealed under this key
    #[error("decryption denied for {key_url}: {reason}")]
    DecryptionDenied {
        /// Key URL or resource the requester was refused
        key_url: String,
        /// Collaborator's reason
        reason: String,
    },

    /// Envelope or sealed reference cannot be decoded or authenticated
    #[error("malformed envelope: {reason}")]
    Malformed {
        /// What was wrong
        reason: String,
    },

    /// Downloaded blob does not match the integrity tag in its SCR
    #[error("integrity mismatch for blob {loc}")]
    IntegrityMismatch {
        /// Blob location
        loc: String,
    },

    /// Channel is locked for deletion and rejects writes
    #[error("channel {channel_id} is locked for deletion")]
    ChannelLocked {
        /// Locked channel
        channel_id: String,
    },

    /// Channel is active and deletion was guarded
    #[error("channel {channel_id} is active")]
    ChannelActive {
        /// Active channel
        channel_id: String,
    },

    /// Channel, content or blob does not exist
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// `next()` was called on a page without continuation
    #[error("no more data")]
    NoMoreData,

    /// Requester is not a member of the owning conversation
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Collaborator's reason
        reason: String,
    },

    /// Request was rejected before reaching a collaborator, or a collaborator
    /// rejected it as malformed
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong
        reason: String,
    },

    /// Collaborator failed internally
    #[error("service failure: {reason}")]
    Service {
        /// Failure description
        reason: String,
    },
}

impl BoardError {
    /// Invalid request built from any message.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest { reason: reason.into() }
    }

    /// Malformed envelope built from any message.
    pub fn malformed(reason: impl ToString) -> Self {
        Self::Malformed { reason: reason.to_string() }
    }

    /// Map a KMS rejection while resolving or fetching a key for writing.
    pub fn key_unavailable(resource: &str, err: ServiceError) -> Self {
        match err {
            ServiceError::Denied { reason } | ServiceError::NotFound { what: reason } => {
                Self::KeyUnavailable { resource: resource.to_string(), reason }
            },
            other => Self::from(other),
        }
    }

    /// Map a KMS rejection while fetching a key for reading.
    pub fn decryption_denied(key_url: &str, err: ServiceError) -> Self {
        match err {
            ServiceError::Denied { reason } | ServiceError::NotFound { what: reason } => {
                Self::DecryptionDenied { key_url: key_url.to_string(), reason }
            },
            other => Self::from(other),
        }
    }

    /// Reinterpret a failed key resolution as a read denial.
    #[must_use]
    pub fn into_read_denial(self) -> Self {
        match self {
            Self::KeyUnavailable { resource, reason } => {
                Self::DecryptionDenied { key_url: resource, reason }
            },
            other => other,
        }
    }

    /// Returns true if the requester lacks access (not a member, key denied).
    ///
    /// Callers should not retry these; access only changes when membership
    /// does.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            Self::KeyUnavailable { .. } | Self::DecryptionDenied { .. } | Self::Forbidden { .. }
        )
    }

    /// Returns true if stored or downloaded data failed authentication.
    pub fn is_data_corruption(&self) -> bool {
        matches!(self, Self::Malformed { .. } | Self::IntegrityMismatch { .. })
    }

    /// Returns true if a channel lifecycle rule rejected the operation.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::ChannelLocked { .. } | Self::ChannelActive { .. })
    }
}

impl From<ServiceError> for BoardError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Denied { reason } => Self::Forbidden { reason },
            ServiceError::NotFound { what } => Self::NotFound { what },
            ServiceError::Locked { channel_id } => Self::ChannelLocked { channel_id },
            ServiceError::Active { channel_id } => Self::ChannelActive { channel_id },
            ServiceError::Invalid { reason } => Self::InvalidRequest { reason },
            ServiceError::Unavailable { reason } => Self::Service { reason },
        }
    }
}

impl From<ProtocolError> for BoardError {
    fn from(err: ProtocolError) -> Self {
        Self::malformed(err)
    }
}

impl From<CryptoError> for BoardError {
    fn from(err: CryptoError) -> Self {
        Self::malformed(err)
    }
}
