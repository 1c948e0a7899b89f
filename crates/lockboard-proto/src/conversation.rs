//! Conversation, identity and key-management types.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// A participant identity as seen by collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Create a user id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A conversation that boards attach to.
///
/// Owned by the directory collaborator. Channels link to `acl_url` but mint
/// their own KMS resource, so none of the URLs here are reused by a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation id
    pub id: String,
    /// The conversation's access-control list
    pub acl_url: String,
    /// KMS resource protecting conversation activities
    pub kms_resource_url: String,
    /// Key used for conversation activities
    pub default_encryption_key_url: String,
}

/// A freshly minted KMS resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmsResource {
    /// Handle for the protection domain
    pub resource_url: String,
    /// First key bound to the resource
    pub default_key_url: String,
}

/// 32 bytes of key material released by the KMS for one key URL.
///
/// Zeroized on drop; never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial([u8; 32]);

impl KeyMaterial {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_material_debug_is_redacted() {
        let key = KeyMaterial::from_bytes([7; 32]);
        assert_eq!(format!("{key:?}"), "KeyMaterial(..)");
    }

    #[test]
    fn user_id_display() {
        assert_eq!(UserId::new("alice").to_string(), "alice");
    }
}
