//! Content records, encrypted envelopes and secure content references.
//!
//! A record travels in three shapes:
//!
//! - [`NewContent`]: what an application hands to the client
//! - [`EncryptedContent`]: the sealed envelope the board service stores
//! - [`ContentRecord`]: what a reader gets back after decryption
//!
//! The service wraps envelopes in [`StoredContent`] to attach the ids and
//! ordering key it assigns.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Envelope format version written by this crate.
pub const ENVELOPE_VERSION: u8 = 1;

/// Content type used for uploaded images and files.
pub const FILE_CONTENT_TYPE: &str = "FILE";

/// Secure Content Reference: capability to fetch and decrypt one blob.
///
/// Possession of an SCR is enough to download and decrypt the blob it points
/// to, so SCRs only ever leave the client sealed under a channel key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scr {
    /// Location handle returned by the blob store
    pub loc: String,
    /// Per-blob symmetric key
    pub key: [u8; 32],
    /// Nonce the blob was encrypted with
    pub nonce: [u8; 24],
    /// SHA-256 over the blob ciphertext
    pub tag: [u8; 32],
}

impl Drop for Scr {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for Scr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scr").field("loc", &self.loc).finish_non_exhaustive()
    }
}

/// An SCR sealed under a channel key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedScr {
    /// AEAD nonce
    pub nonce: [u8; 24],
    /// Sealed CBOR-encoded [`Scr`]
    pub ciphertext: Vec<u8>,
}

/// File attachment of a content record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Reference to the uploaded, encrypted blob
    pub scr: Scr,
    /// MIME type of the plaintext
    pub mime_type: String,
    /// Plaintext size in bytes
    pub size: u64,
}

/// A record as submitted by an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContent {
    /// Free-form type tag (e.g. "curve", "FILE")
    #[serde(rename = "type")]
    pub kind: String,
    /// Application-defined payload, typically serialized JSON
    pub payload: String,
    /// Optional string metadata (e.g. `displayName`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    /// File attachment, present for uploaded binaries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
}

impl NewContent {
    /// A record with a type tag and payload, no metadata, no file.
    pub fn new(kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { kind: kind.into(), payload: payload.into(), metadata: None, file: None }
    }

    /// Attach one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.get_or_insert_with(BTreeMap::new).insert(key.into(), value.into());
        self
    }

    /// Attach a file reference.
    #[must_use]
    pub fn with_file(mut self, file: FileRef) -> Self {
        self.file = Some(file);
        self
    }
}

/// Plaintext sealed inside an [`EncryptedContent`].
///
/// Metadata is always present here; absent metadata on input is normalized to
/// an empty map before sealing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBody {
    /// Type tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Payload
    pub payload: String,
    /// Metadata, empty when none was supplied
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// File attachment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRef>,
}

/// A sealed content record as stored by the board service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedContent {
    /// Envelope format version
    pub version: u8,
    /// Key the body is sealed under
    pub encryption_key_url: String,
    /// AEAD nonce
    pub nonce: [u8; 24],
    /// Sealed CBOR-encoded [`ContentBody`]
    pub ciphertext: Vec<u8>,
}

/// An envelope plus the ids and ordering key the service assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredContent {
    /// Server-assigned id
    pub content_id: String,
    /// Owning channel
    pub channel_id: String,
    /// Server-assigned insertion sequence
    pub created_at: u64,
    /// The sealed record
    pub content: EncryptedContent,
}

/// A decrypted content record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Server-assigned id
    pub content_id: String,
    /// Owning channel
    pub channel_id: String,
    /// Type tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Plaintext payload
    pub payload: String,
    /// Metadata, never absent
    pub metadata: BTreeMap<String, String>,
    /// File attachment
    pub file: Option<FileRef>,
    /// Key the record was sealed under
    pub encryption_key_url: String,
    /// Insertion sequence
    pub created_at: u64,
}

impl ContentRecord {
    /// Combine service-assigned fields with a decrypted body.
    pub fn from_parts(stored: &StoredContent, body: ContentBody) -> Self {
        Self {
            content_id: stored.content_id.clone(),
            channel_id: stored.channel_id.clone(),
            kind: body.kind,
            payload: body.payload,
            metadata: body.metadata,
            file: body.file,
            encryption_key_url: stored.content.encryption_key_url.clone(),
            created_at: stored.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_cbor, to_cbor};

    fn sample_scr() -> Scr {
        Scr { loc: "blob://7".to_string(), key: [9; 32], nonce: [1; 24], tag: [2; 32] }
    }

    #[test]
    fn scr_debug_hides_key() {
        let rendered = format!("{:?}", sample_scr());
        assert!(rendered.contains("blob://7"));
        assert!(!rendered.contains('9'));
    }

    #[test]
    fn body_without_metadata_decodes_to_empty_map() {
        // A body written without a metadata field at all
        let new = NewContent::new("curve", "{}");
        let bytes = to_cbor(&new).unwrap();

        let body: ContentBody = from_cbor(&bytes).unwrap();
        assert!(body.metadata.is_empty());
        assert_eq!(body.kind, "curve");
    }

    #[test]
    fn with_metadata_builds_map() {
        let content = NewContent::new(FILE_CONTENT_TYPE, "")
            .with_metadata("displayName", "sample.png")
            .with_metadata("layer", "2");

        let metadata = content.metadata.unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata["displayName"], "sample.png");
    }

    #[test]
    fn stored_content_roundtrip() {
        let stored = StoredContent {
            content_id: "k1".to_string(),
            channel_id: "c1".to_string(),
            created_at: 4,
            content: EncryptedContent {
                version: ENVELOPE_VERSION,
                encryption_key_url: "kms://keys/1".to_string(),
                nonce: [5; 24],
                ciphertext: vec![0xAA; 40],
            },
        };

        let decoded: StoredContent = from_cbor(&to_cbor(&stored).unwrap()).unwrap();
        assert_eq!(decoded, stored);
    }

    #[test]
    fn type_field_is_named_type_on_the_wire() {
        let bytes = to_cbor(&NewContent::new("curve", "p")).unwrap();
        let value: ciborium::Value = ciborium::from_reader(bytes.as_slice()).unwrap();

        let ciborium::Value::Map(entries) = value else {
            unreachable!("records encode as maps");
        };
        assert!(entries.iter().any(|(k, _)| k.as_text() == Some("type")));
    }

    #[test]
    fn record_from_parts_keeps_service_fields() {
        let stored = StoredContent {
            content_id: "k9".to_string(),
            channel_id: "c3".to_string(),
            created_at: 11,
            content: EncryptedContent {
                version: ENVELOPE_VERSION,
                encryption_key_url: "kms://keys/3".to_string(),
                nonce: [0; 24],
                ciphertext: Vec::new(),
            },
        };
        let body = ContentBody {
            kind: "curve".to_string(),
            payload: "{\"id\":1}".to_string(),
            metadata: BTreeMap::new(),
            file: Some(FileRef { scr: sample_scr(), mime_type: "image/png".to_string(), size: 3 }),
        };

        let record = ContentRecord::from_parts(&stored, body);
        assert_eq!(record.content_id, "k9");
        assert_eq!(record.created_at, 11);
        assert_eq!(record.encryption_key_url, "kms://keys/3");
        assert_eq!(record.file.map(|f| f.scr.loc.clone()), Some("blob://7".to_string()));
    }
}
