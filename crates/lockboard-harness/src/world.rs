//! A complete simulated deployment.
//!
//! [`SimWorld`] wires the directory, KMS, blob store and reference board
//! service together behind one seeded environment, and implements every
//! collaborator trait so it can be handed straight to a
//! [`BoardClient`](lockboard_core::BoardClient).

use lockboard_core::{
    BlobStore, BoardApi, BoardClient, BoardConfig, ConversationService, Environment, KeyManagement,
};
use lockboard_proto::{
    Channel, ChannelImage, Conversation, Cursor, EncryptedContent, KeyMaterial, KmsResource,
    NewChannel, RawPage, ServiceError, StoredContent, UserId,
};
use lockboard_server::{BoardService, MemoryStorage, ServiceConfig, Storage};

use crate::{blobs::MemoryBlobStore, directory::MemoryDirectory, kms::MemoryKms, sim_env::SimEnv};

/// Client type produced by [`SimWorld::client`].
pub type SimClient<St = MemoryStorage> = BoardClient<SimEnv, SimWorld<St>>;

/// In-process deployment of every collaborator.
///
/// Clones share state.
#[derive(Clone)]
pub struct SimWorld<St: Storage = MemoryStorage> {
    env: SimEnv,
    directory: MemoryDirectory,
    kms: MemoryKms,
    blobs: MemoryBlobStore,
    board: BoardService<SimEnv, St, MemoryDirectory>,
}

impl SimWorld {
    /// World with in-memory board storage.
    pub fn new(seed: u64) -> Self {
        Self::with_storage(seed, MemoryStorage::new())
    }
}

impl<St: Storage> SimWorld<St> {
    /// World whose board service persists to `storage`.
    pub fn with_storage(seed: u64, storage: St) -> Self {
        Self::with_service_config(seed, storage, ServiceConfig::default())
    }

    /// World with explicit board service limits.
    pub fn with_service_config(seed: u64, storage: St, config: ServiceConfig) -> Self {
        let env = SimEnv::with_seed(seed);
        let directory = MemoryDirectory::new();
        let kms = MemoryKms::new(env.clone(), directory.clone());
        let blobs = MemoryBlobStore::new(env.clone());
        let board = BoardService::with_config(env.clone(), storage, directory.clone(), config);

        Self { env, directory, kms, blobs, board }
    }

    /// Same directory, KMS and blobs, with a board service over `storage`.
    ///
    /// Used to inspect the state behind a fault-injecting wrapper.
    pub fn reattach<T: Storage>(&self, storage: T) -> SimWorld<T> {
        SimWorld {
            env: self.env.clone(),
            directory: self.directory.clone(),
            kms: self.kms.clone(),
            blobs: self.blobs.clone(),
            board: BoardService::with_config(
                self.env.clone(),
                storage,
                self.directory.clone(),
                self.board.config().clone(),
            ),
        }
    }

    /// Create a conversation with `members`; the first member creates its KMS
    /// resource.
    ///
    /// # Errors
    ///
    /// `Invalid` if `members` is empty.
    pub fn create_conversation(&self, members: &[&str]) -> Result<Conversation, ServiceError> {
        let Some(creator) = members.first() else {
            return Err(ServiceError::invalid("a conversation needs at least one member"));
        };

        let id = format!("{:032x}", self.env.random_u128());
        let acl_url = format!("acl://conversations/{id}");
        self.directory.register(&id, &acl_url, members.iter().map(|m| UserId::new(*m)))?;

        let resource = self.kms.mint_resource(&UserId::new(*creator), &acl_url)?;

        tracing::debug!(conversation_id = %id, members = members.len(), "conversation created");
        Ok(Conversation {
            id,
            acl_url,
            kms_resource_url: resource.resource_url,
            default_encryption_key_url: resource.default_key_url,
        })
    }

    /// Client acting for `user` with default configuration.
    pub fn client(&self, user: &str) -> SimClient<St> {
        BoardClient::new(UserId::new(user), self.env.clone(), self.clone())
    }

    /// Client acting for `user` with explicit configuration.
    pub fn client_with_config(&self, user: &str, config: BoardConfig) -> SimClient<St> {
        BoardClient::with_config(UserId::new(user), self.env.clone(), self.clone(), config)
    }

    /// Shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Conversation directory.
    pub fn directory(&self) -> &MemoryDirectory {
        &self.directory
    }

    /// Key management service.
    pub fn kms(&self) -> &MemoryKms {
        &self.kms
    }

    /// Blob store.
    pub fn blobs(&self) -> &MemoryBlobStore {
        &self.blobs
    }

    /// Board service.
    pub fn board(&self) -> &BoardService<SimEnv, St, MemoryDirectory> {
        &self.board
    }
}

impl<St: Storage> ConversationService for SimWorld<St> {
    async fn resolve_acl(&self, requester: &UserId, conversation_id: &str) -> Result<String, ServiceError> {
        self.directory.resolve_acl(requester, conversation_id)
    }

    async fn leave(&self, requester: &UserId, conversation_id: &str) -> Result<(), ServiceError> {
        self.directory.leave(requester, conversation_id)
    }
}

impl<St: Storage> KeyManagement for SimWorld<St> {
    async fn mint_resource(&self, requester: &UserId, acl_url: &str) -> Result<KmsResource, ServiceError> {
        self.kms.mint_resource(requester, acl_url)
    }

    async fn resolve(&self, requester: &UserId, resource_url: &str) -> Result<String, ServiceError> {
        self.kms.resolve(requester, resource_url)
    }

    async fn fetch_key(&self, requester: &UserId, key_url: &str) -> Result<KeyMaterial, ServiceError> {
        self.kms.fetch_key(requester, key_url)
    }
}

impl<St: Storage> BlobStore for SimWorld<St> {
    async fn upload(&self, _requester: &UserId, ciphertext: Vec<u8>) -> Result<String, ServiceError> {
        Ok(self.blobs.upload(ciphertext))
    }

    async fn fetch(&self, _requester: &UserId, loc: &str) -> Result<Vec<u8>, ServiceError> {
        self.blobs.fetch(loc)
    }
}

impl<St: Storage> BoardApi for SimWorld<St> {
    async fn create_channel(&self, requester: &UserId, request: NewChannel) -> Result<Channel, ServiceError> {
        self.board.create_channel(requester, request)
    }

    async fn get_channel(&self, requester: &UserId, channel_id: &str) -> Result<Channel, ServiceError> {
        self.board.get_channel(requester, channel_id)
    }

    async fn list_channels(
        &self,
        requester: &UserId,
        acl_url_link: &str,
        kind: Option<&str>,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<RawPage<Channel>, ServiceError> {
        self.board.list_channels(requester, acl_url_link, kind, cursor, limit)
    }

    async fn add_contents(
        &self,
        requester: &UserId,
        channel_id: &str,
        contents: Vec<EncryptedContent>,
    ) -> Result<Vec<StoredContent>, ServiceError> {
        self.board.add_contents(requester, channel_id, contents)
    }

    async fn list_contents(
        &self,
        requester: &UserId,
        channel_id: &str,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<RawPage<StoredContent>, ServiceError> {
        self.board.list_contents(requester, channel_id, cursor, limit)
    }

    async fn delete_all_contents(&self, requester: &UserId, channel_id: &str) -> Result<(), ServiceError> {
        self.board.delete_all_contents(requester, channel_id)
    }

    async fn set_image(
        &self,
        requester: &UserId,
        channel_id: &str,
        image: ChannelImage,
    ) -> Result<Channel, ServiceError> {
        self.board.set_image(requester, channel_id, image)
    }

    async fn lock_for_deletion(&self, requester: &UserId, channel_id: &str) -> Result<Channel, ServiceError> {
        self.board.lock_for_deletion(requester, channel_id)
    }

    async fn keep_active(&self, requester: &UserId, channel_id: &str) -> Result<Channel, ServiceError> {
        self.board.keep_active(requester, channel_id)
    }

    async fn delete_channel(
        &self,
        requester: &UserId,
        acl_url_link: &str,
        channel_id: &str,
        prevent_delete_active: bool,
    ) -> Result<(), ServiceError> {
        self.board.delete_channel(requester, acl_url_link, channel_id, prevent_delete_active)
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        self.board.ping()
    }
}
