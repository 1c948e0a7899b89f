//! Remote collaborators the client talks to.
//!
//! Every call is scoped to a requester so collaborators can enforce
//! conversation membership. All methods are async suspension points; an
//! implementation may be a network client or the in-process simulation in
//! the harness.

use std::future::Future;

use lockboard_proto::{
    Channel, ChannelImage, Cursor, EncryptedContent, KeyMaterial, KmsResource, NewChannel,
    RawPage, ServiceError, StoredContent, UserId,
};

/// Directory of conversations and their ACLs.
pub trait ConversationService: Send + Sync {
    /// ACL URL of a conversation the requester participates in.
    fn resolve_acl(
        &self,
        requester: &UserId,
        conversation_id: &str,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;

    /// Remove the requester from a conversation.
    fn leave(
        &self,
        requester: &UserId,
        conversation_id: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

/// Key management service.
///
/// Releases key material only to members of the ACL a resource is bound to.
pub trait KeyManagement: Send + Sync {
    /// Mint a new resource bound to `acl_url`, with one default key.
    fn mint_resource(
        &self,
        requester: &UserId,
        acl_url: &str,
    ) -> impl Future<Output = Result<KmsResource, ServiceError>> + Send;

    /// Current key URL of a resource.
    fn resolve(
        &self,
        requester: &UserId,
        resource_url: &str,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;

    /// Key material for a key URL.
    fn fetch_key(
        &self,
        requester: &UserId,
        key_url: &str,
    ) -> impl Future<Output = Result<KeyMaterial, ServiceError>> + Send;
}

/// Opaque storage for encrypted blobs.
pub trait BlobStore: Send + Sync {
    /// Store ciphertext, returning its location handle.
    fn upload(
        &self,
        requester: &UserId,
        ciphertext: Vec<u8>,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;

    /// Fetch ciphertext by location handle.
    fn fetch(
        &self,
        requester: &UserId,
        loc: &str,
    ) -> impl Future<Output = Result<Vec<u8>, ServiceError>> + Send;
}

/// Board service: channels and their paged content collections.
///
/// The service never sees plaintext. It enforces the channel lifecycle and
/// issues opaque continuation cursors.
pub trait BoardApi: Send + Sync {
    /// Create a channel linked to a conversation ACL.
    fn create_channel(
        &self,
        requester: &UserId,
        request: NewChannel,
    ) -> impl Future<Output = Result<Channel, ServiceError>> + Send;

    /// Current metadata of a channel.
    fn get_channel(
        &self,
        requester: &UserId,
        channel_id: &str,
    ) -> impl Future<Output = Result<Channel, ServiceError>> + Send;

    /// One page of the channels linked to `acl_url_link`, in creation order.
    fn list_channels(
        &self,
        requester: &UserId,
        acl_url_link: &str,
        kind: Option<&str>,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> impl Future<Output = Result<RawPage<Channel>, ServiceError>> + Send;

    /// Append a batch atomically, in submission order.
    fn add_contents(
        &self,
        requester: &UserId,
        channel_id: &str,
        contents: Vec<EncryptedContent>,
    ) -> impl Future<Output = Result<Vec<StoredContent>, ServiceError>> + Send;

    /// One page of a channel's contents, in insertion order.
    fn list_contents(
        &self,
        requester: &UserId,
        channel_id: &str,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> impl Future<Output = Result<RawPage<StoredContent>, ServiceError>> + Send;

    /// Remove every record of a channel.
    fn delete_all_contents(
        &self,
        requester: &UserId,
        channel_id: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Replace a channel's snapshot image.
    fn set_image(
        &self,
        requester: &UserId,
        channel_id: &str,
        image: ChannelImage,
    ) -> impl Future<Output = Result<Channel, ServiceError>> + Send;

    /// Lock a channel for deletion.
    fn lock_for_deletion(
        &self,
        requester: &UserId,
        channel_id: &str,
    ) -> impl Future<Output = Result<Channel, ServiceError>> + Send;

    /// Mark a channel active.
    fn keep_active(
        &self,
        requester: &UserId,
        channel_id: &str,
    ) -> impl Future<Output = Result<Channel, ServiceError>> + Send;

    /// Delete a channel linked to `acl_url_link`.
    fn delete_channel(
        &self,
        requester: &UserId,
        acl_url_link: &str,
        channel_id: &str,
        prevent_delete_active: bool,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Liveness probe.
    fn ping(&self) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

/// Everything a [`BoardClient`](crate::BoardClient) needs from the outside
/// world.
pub trait Services:
    ConversationService + KeyManagement + BlobStore + BoardApi + Clone + 'static
{
}

impl<T> Services for T where
    T: ConversationService + KeyManagement + BlobStore + BoardApi + Clone + 'static
{
}
