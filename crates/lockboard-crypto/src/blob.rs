//! Blob encryption for uploaded files
//!
//! # Security Properties
//!
//! - Key Independence: every blob gets a fresh random key, unrelated to any
//!   channel key
//! - Integrity: the SHA-256 tag over the ciphertext travels in the SCR and is
//!   checked in constant time before decryption
//! - Authenticity: the AEAD tag still guards against forged ciphertext that
//!   happens to match a forged SCR tag

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{
    aead::{KEY_SIZE, NONCE_SIZE, open, seal},
    error::CryptoError,
};

/// SHA-256 integrity tag size (32 bytes)
pub const INTEGRITY_TAG_SIZE: usize = 32;

/// Associated data for blob encryption
const BLOB_AAD: &[u8] = b"lockboardBlobV1";

/// A random per-blob key.
///
/// Zeroized on drop. Cloned only into the SCR that carries it.
#[derive(Clone, PartialEq, Eq)]
pub struct BlobKey {
    key: [u8; KEY_SIZE],
}

impl BlobKey {
    /// Wrap caller-provided random bytes as a blob key.
    pub fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl Drop for BlobKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BlobKey(..)")
    }
}

/// Result of encrypting a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    /// Ciphertext including the 16-byte Poly1305 tag
    pub ciphertext: Vec<u8>,
    /// SHA-256 over `ciphertext`
    pub tag: [u8; INTEGRITY_TAG_SIZE],
}

/// SHA-256 integrity tag over a blob ciphertext.
pub fn integrity_tag(ciphertext: &[u8]) -> [u8; INTEGRITY_TAG_SIZE] {
    Sha256::digest(ciphertext).into()
}

/// Encrypt blob bytes under a fresh blob key.
pub fn encrypt_blob(plaintext: &[u8], key: &BlobKey, nonce: &[u8; NONCE_SIZE]) -> EncryptedBlob {
    let ciphertext = seal(key.as_bytes(), nonce, BLOB_AAD, plaintext);
    let tag = integrity_tag(&ciphertext);

    EncryptedBlob { ciphertext, tag }
}

/// Verify and decrypt a blob.
///
/// # Errors
///
/// - `IntegrityMismatch`: ciphertext does not hash to `expected_tag`, or the
///   AEAD tag fails under `key`
pub fn decrypt_blob(
    ciphertext: &[u8],
    key: &BlobKey,
    nonce: &[u8; NONCE_SIZE],
    expected_tag: &[u8; INTEGRITY_TAG_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    let actual = integrity_tag(ciphertext);
    if !bool::from(actual.as_slice().ct_eq(expected_tag.as_slice())) {
        return Err(CryptoError::IntegrityMismatch);
    }

    open(key.as_bytes(), nonce, BLOB_AAD, ciphertext).map_err(|_| CryptoError::IntegrityMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> BlobKey {
        BlobKey::from_bytes([seed; KEY_SIZE])
    }

    #[test]
    fn blob_roundtrip() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A];
        let nonce = [0x01; NONCE_SIZE];

        let encrypted = encrypt_blob(&bytes, &key(1), &nonce);
        let decrypted = decrypt_blob(&encrypted.ciphertext, &key(1), &nonce, &encrypted.tag).unwrap();

        assert_eq!(decrypted, bytes);
    }

    #[test]
    fn large_blob_roundtrip() {
        let bytes = vec![0x42u8; 256 * 1024];
        let nonce = [0x02; NONCE_SIZE];

        let encrypted = encrypt_blob(&bytes, &key(2), &nonce);
        let decrypted = decrypt_blob(&encrypted.ciphertext, &key(2), &nonce, &encrypted.tag).unwrap();

        assert_eq!(decrypted, bytes);
    }

    #[test]
    fn tag_covers_ciphertext() {
        let encrypted = encrypt_blob(b"image", &key(3), &[0x03; NONCE_SIZE]);
        assert_eq!(encrypted.tag, integrity_tag(&encrypted.ciphertext));
    }

    #[test]
    fn modified_ciphertext_is_integrity_mismatch() {
        let nonce = [0x04; NONCE_SIZE];
        let mut encrypted = encrypt_blob(b"image bytes", &key(4), &nonce);
        encrypted.ciphertext[0] ^= 0x01;

        let result = decrypt_blob(&encrypted.ciphertext, &key(4), &nonce, &encrypted.tag);
        assert_eq!(result, Err(CryptoError::IntegrityMismatch));
    }

    #[test]
    fn forged_tag_with_wrong_key_is_integrity_mismatch() {
        let nonce = [0x05; NONCE_SIZE];
        let encrypted = encrypt_blob(b"image bytes", &key(5), &nonce);

        // Tag matches, key does not
        let result = decrypt_blob(&encrypted.ciphertext, &key(6), &nonce, &encrypted.tag);
        assert_eq!(result, Err(CryptoError::IntegrityMismatch));
    }

    #[test]
    fn debug_does_not_leak_key() {
        assert_eq!(format!("{:?}", key(7)), "BlobKey(..)");
    }
}
