//! Error types for cryptographic operations

use thiserror::Error;

/// Errors from crypto primitives
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// AEAD authentication failed (wrong key, wrong associated data, or
    /// tampered ciphertext)
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Blob ciphertext does not match the integrity tag carried in its SCR
    #[error("integrity tag mismatch")]
    IntegrityMismatch,

    /// Invalid key material length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length
        expected: usize,
        /// Actual key length
        actual: usize,
    },
}

impl CryptoError {
    /// Returns true if the error indicates corrupted or forged data rather than
    /// a caller mistake.
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::AuthenticationFailed | Self::IntegrityMismatch => true,
            Self::InvalidKeyLength { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_failures_are_corruption() {
        assert!(CryptoError::AuthenticationFailed.is_corruption());
        assert!(CryptoError::IntegrityMismatch.is_corruption());
    }

    #[test]
    fn key_length_is_not_corruption() {
        let err = CryptoError::InvalidKeyLength { expected: 32, actual: 16 };
        assert!(!err.is_corruption());
        assert_eq!(err.to_string(), "invalid key length: expected 32, got 16");
    }
}
