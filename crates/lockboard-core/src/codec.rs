//! Content codec: records to sealed envelopes and blobs to SCRs.
//!
//! Record bodies are CBOR-encoded and sealed with XChaCha20-Poly1305 under a
//! key derived from the KMS material for `encryption_key_url`. The key URL is
//! also the AEAD associated data, so an envelope cannot be relabelled to claim
//! a different key.
//!
//! Blobs get a fresh random key each; the resulting [`Scr`] is the only way
//! to read them, and is itself sealed under a channel key before it is
//! attached to anything.

use lockboard_crypto::{
    BlobKey, KeyPurpose, NONCE_SIZE, decrypt_blob, derive_key, encrypt_blob, open, seal,
};
use lockboard_proto::{
    ContentBody, ENVELOPE_VERSION, EncryptedContent, KeyMaterial, NewContent, Scr, SealedScr,
    from_cbor, to_cbor,
};

use crate::{env::Environment, error::BoardError};

/// A blob encrypted and ready to upload.
///
/// Becomes an [`Scr`] once the blob store has assigned a location.
pub struct PendingBlob {
    key: BlobKey,
    nonce: [u8; NONCE_SIZE],
    tag: [u8; 32],
    /// Bytes to hand to the blob store
    pub ciphertext: Vec<u8>,
}

impl PendingBlob {
    /// Reference to the uploaded blob at `loc`.
    pub fn into_scr(self, loc: impl Into<String>) -> Scr {
        Scr { loc: loc.into(), key: *self.key.as_bytes(), nonce: self.nonce, tag: self.tag }
    }
}

impl std::fmt::Debug for PendingBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingBlob").field("len", &self.ciphertext.len()).finish_non_exhaustive()
    }
}

/// The body a record is sealed as: absent metadata becomes an empty map.
pub fn normalized_body(record: &NewContent) -> ContentBody {
    ContentBody {
        kind: record.kind.clone(),
        payload: record.payload.clone(),
        metadata: record.metadata.clone().unwrap_or_default(),
        file: record.file.clone(),
    }
}

/// Encrypts and decrypts records, blobs and SCRs.
///
/// Holds only the environment used to draw nonces and blob keys.
#[derive(Debug, Clone)]
pub struct ContentCodec<E> {
    env: E,
}

impl<E: Environment> ContentCodec<E> {
    /// Codec drawing randomness from `env`.
    pub fn new(env: E) -> Self {
        Self { env }
    }

    /// Seal a record under the key at `key_url`.
    ///
    /// Absent metadata is written as an empty map.
    ///
    /// # Errors
    ///
    /// - `Malformed` if the key material is unusable or the body cannot be
    ///   encoded
    pub fn encrypt_record(
        &self,
        key_url: &str,
        material: &KeyMaterial,
        record: &NewContent,
    ) -> Result<EncryptedContent, BoardError> {
        let plaintext = to_cbor(&normalized_body(record))?;

        let key = derive_key(material.as_bytes(), key_url, KeyPurpose::Record)?;
        let nonce: [u8; NONCE_SIZE] = self.env.random_array();
        let ciphertext = seal(key.as_bytes(), &nonce, key_url.as_bytes(), &plaintext);

        Ok(EncryptedContent {
            version: ENVELOPE_VERSION,
            encryption_key_url: key_url.to_string(),
            nonce,
            ciphertext,
        })
    }

    /// Open an envelope with the material for its `encryption_key_url`.
    ///
    /// # Errors
    ///
    /// - `Malformed` if the envelope has an unknown version, fails
    ///   authentication, or does not contain a record body
    pub fn decrypt_record(
        &self,
        material: &KeyMaterial,
        envelope: &EncryptedContent,
    ) -> Result<ContentBody, BoardError> {
        if envelope.version != ENVELOPE_VERSION {
            return Err(BoardError::malformed(format!(
                "unsupported envelope version {}",
                envelope.version
            )));
        }

        let key_url = envelope.encryption_key_url.as_str();
        let key = derive_key(material.as_bytes(), key_url, KeyPurpose::Record)?;
        let plaintext = open(key.as_bytes(), &envelope.nonce, key_url.as_bytes(), &envelope.ciphertext)?;

        Ok(from_cbor(&plaintext)?)
    }

    /// Encrypt blob bytes under a fresh random key.
    pub fn encrypt_blob(&self, bytes: &[u8]) -> PendingBlob {
        let key = BlobKey::from_bytes(self.env.random_array());
        let nonce: [u8; NONCE_SIZE] = self.env.random_array();
        let encrypted = encrypt_blob(bytes, &key, &nonce);

        PendingBlob { key, nonce, tag: encrypted.tag, ciphertext: encrypted.ciphertext }
    }

    /// Verify and decrypt downloaded blob bytes.
    ///
    /// # Errors
    ///
    /// - `IntegrityMismatch` if the bytes do not match the SCR's tag or fail
    ///   authentication
    pub fn decrypt_blob(&self, scr: &Scr, ciphertext: &[u8]) -> Result<Vec<u8>, BoardError> {
        let key = BlobKey::from_bytes(scr.key);
        decrypt_blob(ciphertext, &key, &scr.nonce, &scr.tag)
            .map_err(|_| BoardError::IntegrityMismatch { loc: scr.loc.clone() })
    }

    /// Seal an SCR under the key at `key_url`.
    ///
    /// # Errors
    ///
    /// - `Malformed` if the key material is unusable
    pub fn seal_scr(
        &self,
        key_url: &str,
        material: &KeyMaterial,
        scr: &Scr,
    ) -> Result<SealedScr, BoardError> {
        let plaintext = to_cbor(scr)?;
        let key = derive_key(material.as_bytes(), key_url, KeyPurpose::Scr)?;
        let nonce: [u8; NONCE_SIZE] = self.env.random_array();
        let ciphertext = seal(key.as_bytes(), &nonce, key_url.as_bytes(), &plaintext);

        Ok(SealedScr { nonce, ciphertext })
    }

    /// Open an SCR sealed under the key at `key_url`.
    ///
    /// # Errors
    ///
    /// - `Malformed` if the sealed bytes fail authentication or do not decode
    pub fn open_scr(
        &self,
        key_url: &str,
        material: &KeyMaterial,
        sealed: &SealedScr,
    ) -> Result<Scr, BoardError> {
        let key = derive_key(material.as_bytes(), key_url, KeyPurpose::Scr)?;
        let plaintext = open(key.as_bytes(), &sealed.nonce, key_url.as_bytes(), &sealed.ciphertext)?;

        Ok(from_cbor(&plaintext)?)
    }
}
