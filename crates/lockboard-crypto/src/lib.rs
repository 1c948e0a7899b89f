//! Lockboard Cryptographic Primitives
//!
//! Cryptographic building blocks for Lockboard. Pure functions with
//! deterministic outputs. Callers provide random bytes (nonces, blob keys) for
//! deterministic testing.
//!
//! # Key Lifecycle
//!
//! Every channel owns a KMS resource. The KMS hands out 32 bytes of key
//! material per key URL to authorized participants. Content keys are never the
//! raw material: a purpose-specific key is derived with HKDF, bound to the key
//! URL so that material fetched for one URL cannot open envelopes written under
//! another.
//!
//! ```text
//! KMS key material (per key URL)
//!        │
//!        ├─ HKDF("record" ‖ key URL) → record key → AEAD(content body)
//!        │
//!        └─ HKDF("scr" ‖ key URL)    → scr key    → AEAD(secure content ref)
//!
//! Random blob key (per upload) → AEAD(image bytes) → SHA-256 integrity tag
//! ```
//!
//! # Security
//!
//! Authenticity:
//! - XChaCha20-Poly1305 AEAD provides tamper-proof encryption
//! - The key URL is authenticated as associated data
//! - Failed authentication tag -> reject envelope
//!
//! Blob integrity:
//! - Each blob carries a SHA-256 tag over its ciphertext in the SCR
//! - Tags are compared in constant time before any decryption is attempted
//!
//! Key hygiene:
//! - Derived keys and blob keys are zeroized on drop

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod aead;
mod blob;
mod derivation;
mod error;

pub use aead::{KEY_SIZE, NONCE_SIZE, TAG_SIZE, open, seal};
pub use blob::{BlobKey, EncryptedBlob, INTEGRITY_TAG_SIZE, decrypt_blob, encrypt_blob, integrity_tag};
pub use derivation::{DerivedKey, KeyPurpose, derive_key};
pub use error::CryptoError;
