//! [`BoardApi`] for the in-process board service.
//!
//! The service is synchronous; every call completes without suspending.

use lockboard_core::{BoardApi, Environment};
use lockboard_proto::{
    Channel, ChannelImage, Cursor, EncryptedContent, NewChannel, RawPage, ServiceError,
    StoredContent, UserId,
};

use crate::{
    service::{AccessPolicy, BoardService},
    storage::Storage,
};

impl<E: Environment, St: Storage, P: AccessPolicy> BoardApi for BoardService<E, St, P> {
    async fn create_channel(
        &self,
        requester: &UserId,
        request: NewChannel,
    ) -> Result<Channel, ServiceError> {
        Self::create_channel(self, requester, request)
    }

    async fn get_channel(&self, requester: &UserId, channel_id: &str) -> Result<Channel, ServiceError> {
        Self::get_channel(self, requester, channel_id)
    }

    async fn list_channels(
        &self,
        requester: &UserId,
        acl_url_link: &str,
        kind: Option<&str>,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<RawPage<Channel>, ServiceError> {
        Self::list_channels(self, requester, acl_url_link, kind, cursor, limit)
    }

    async fn add_contents(
        &self,
        requester: &UserId,
        channel_id: &str,
        contents: Vec<EncryptedContent>,
    ) -> Result<Vec<StoredContent>, ServiceError> {
        Self::add_contents(self, requester, channel_id, contents)
    }

    async fn list_contents(
        &self,
        requester: &UserId,
        channel_id: &str,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<RawPage<StoredContent>, ServiceError> {
        Self::list_contents(self, requester, channel_id, cursor, limit)
    }

    async fn delete_all_contents(&self, requester: &UserId, channel_id: &str) -> Result<(), ServiceError> {
        Self::delete_all_contents(self, requester, channel_id)
    }

    async fn set_image(
        &self,
        requester: &UserId,
        channel_id: &str,
        image: ChannelImage,
    ) -> Result<Channel, ServiceError> {
        Self::set_image(self, requester, channel_id, image)
    }

    async fn lock_for_deletion(&self, requester: &UserId, channel_id: &str) -> Result<Channel, ServiceError> {
        Self::lock_for_deletion(self, requester, channel_id)
    }

    async fn keep_active(&self, requester: &UserId, channel_id: &str) -> Result<Channel, ServiceError> {
        Self::keep_active(self, requester, channel_id)
    }

    async fn delete_channel(
        &self,
        requester: &UserId,
        acl_url_link: &str,
        channel_id: &str,
        prevent_delete_active: bool,
    ) -> Result<(), ServiceError> {
        Self::delete_channel(self, requester, acl_url_link, channel_id, prevent_delete_active)
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        Self::ping(self)
    }
}
