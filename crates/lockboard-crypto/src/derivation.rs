//! Purpose-bound key derivation using HKDF

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{aead::KEY_SIZE, error::CryptoError};

/// What a derived key will be used for.
///
/// Each purpose has its own HKDF label so a key derived for one purpose can
/// never open data sealed for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    /// Sealing content record bodies
    Record,
    /// Sealing secure content references attached to records and images
    Scr,
}

impl KeyPurpose {
    fn label(self) -> &'static [u8] {
        match self {
            Self::Record => b"lockboardRecordV1",
            Self::Scr => b"lockboardScrV1",
        }
    }
}

/// A 32-byte key derived from KMS key material.
///
/// Zeroized on drop.
pub struct DerivedKey {
    key: [u8; KEY_SIZE],
}

impl DerivedKey {
    /// 32-byte symmetric key for XChaCha20-Poly1305.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Derive a purpose-specific key from KMS key material.
///
/// The key URL is mixed into the HKDF info so material is only usable for the
/// URL it was issued under.
///
/// # Errors
///
/// - `InvalidKeyLength` if `material` is not exactly 32 bytes
pub fn derive_key(
    material: &[u8],
    key_url: &str,
    purpose: KeyPurpose,
) -> Result<DerivedKey, CryptoError> {
    if material.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: material.len() });
    }

    let hkdf = Hkdf::<Sha256>::new(None, material);

    let label = purpose.label();
    let mut info = Vec::with_capacity(label.len() + key_url.len());
    info.extend_from_slice(label);
    info.extend_from_slice(key_url.as_bytes());

    let mut key = [0u8; KEY_SIZE];
    let Ok(()) = hkdf.expand(&info, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    Ok(DerivedKey { key })
}
