//! Channel (board instance) types.

use serde::{Deserialize, Serialize};

use crate::content::SealedScr;

/// Board flavor used when a channel is created without an explicit kind.
pub const DEFAULT_CHANNEL_KIND: &str = "whiteboard";

/// Activity and lock state of a channel.
///
/// The transition rules live in the client core's lifecycle module; this is
/// only the wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityState {
    /// Created, nobody has written yet
    Inactive,
    /// Content was written or a keep-active signal was received
    Active,
    /// Locked for deletion; every write is rejected
    Locked,
    /// Destroyed; unreachable for metadata and content
    Deleted,
}

/// One board instance attached to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Opaque unique id
    pub channel_id: String,
    /// Canonical URL of the channel
    pub channel_url: String,
    /// The channel's own access-control list
    pub acl_url: String,
    /// The owning conversation's ACL this channel is linked to
    pub acl_url_link: String,
    /// KMS resource protecting this channel's content
    pub kms_resource_url: String,
    /// Key for channel-level metadata such as the snapshot image. Fixed at
    /// creation.
    pub default_encryption_key_url: String,
    /// Board flavor (e.g. "whiteboard", "annotated")
    pub kind: String,
    /// Snapshot image, if one was set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ChannelImage>,
    /// Activity/lock state
    pub state: ActivityState,
    /// Server-assigned creation sequence (listing order)
    pub created_at: u64,
}

/// Request body for channel creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChannel {
    /// Conversation ACL to link to
    pub acl_url_link: String,
    /// Freshly minted KMS resource for the channel
    pub kms_resource_url: String,
    /// Default key of that resource
    pub default_encryption_key_url: String,
    /// Board flavor
    pub kind: String,
}

/// Snapshot image attached to a channel.
///
/// The SCR is sealed under the channel's `default_encryption_key_url`, which is
/// repeated here as `encryption_key_url` so any participant can open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelImage {
    /// Key the SCR is sealed under
    pub encryption_key_url: String,
    /// Sealed secure content reference
    pub scr: SealedScr,
    /// MIME type of the image
    pub mime_type: String,
    /// Plaintext size in bytes
    pub file_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_cbor, to_cbor};

    fn sample_channel() -> Channel {
        Channel {
            channel_id: "c1".to_string(),
            channel_url: "board://channels/c1".to_string(),
            acl_url: "acl://channels/c1".to_string(),
            acl_url_link: "acl://conversations/x".to_string(),
            kms_resource_url: "kms://resources/2".to_string(),
            default_encryption_key_url: "kms://keys/2".to_string(),
            kind: DEFAULT_CHANNEL_KIND.to_string(),
            image: None,
            state: ActivityState::Inactive,
            created_at: 0,
        }
    }

    #[test]
    fn channel_cbor_roundtrip() {
        let channel = sample_channel();
        let decoded: Channel = from_cbor(&to_cbor(&channel).unwrap()).unwrap();
        assert_eq!(decoded, channel);
    }

    #[test]
    fn channel_with_image_roundtrip() {
        let mut channel = sample_channel();
        channel.image = Some(ChannelImage {
            encryption_key_url: channel.default_encryption_key_url.clone(),
            scr: SealedScr { nonce: [3; 24], ciphertext: vec![1, 2, 3] },
            mime_type: "image/png".to_string(),
            file_size: 42,
        });

        let decoded: Channel = from_cbor(&to_cbor(&channel).unwrap()).unwrap();
        assert_eq!(decoded, channel);
    }
}
