//! Authenticated encryption using `XChaCha20-Poly1305`
//!
//! All functions are pure - nonces must be provided by the caller.
//! This enables deterministic testing in simulation.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use crate::error::CryptoError;

/// Symmetric key size (32 bytes)
pub const KEY_SIZE: usize = 32;

/// `XChaCha20` nonce size (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Encrypt `plaintext` under `key`, authenticating `aad` alongside it.
///
/// Returns the ciphertext with the 16-byte Poly1305 tag appended.
///
/// # Security
///
/// - Nonces must never repeat for the same key. 24-byte random nonces make
///   collisions negligible
/// - Caller MUST provide cryptographically secure random bytes in production
pub fn seal(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], aad: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new(key.into());

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(nonce), Payload { msg: plaintext, aad })
    else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    ciphertext
}

/// Decrypt and authenticate a ciphertext produced by [`seal`].
///
/// # Errors
///
/// - `AuthenticationFailed`: wrong key, wrong associated data, or tampering
pub fn open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }

    let cipher = XChaCha20Poly1305::new(key.into());

    cipher
        .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::AuthenticationFailed)
}
