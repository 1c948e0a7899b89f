//! Board store facade.
//!
//! [`BoardClient`] is what applications hold. It acts for one participant
//! and composes the key resolver, content codec, lifecycle-enforcing board
//! service and pagination engine into the public operations.
//!
//! Plaintext never leaves this module unencrypted: records are sealed before
//! `add_contents`, blobs before `upload`, and snapshot SCRs before
//! `set_image`.

use std::{collections::HashMap, sync::Arc};

use lockboard_proto::{
    Channel, ChannelImage, ContentBody, ContentRecord, Conversation, Cursor, DEFAULT_CHANNEL_KIND,
    EncryptedContent, FILE_CONTENT_TYPE, FileRef, KeyMaterial, NewChannel, NewContent, RawPage,
    Scr, SealedScr, ServiceError, StoredContent, UserId,
};
use tracing::{debug, info, warn};

use crate::{
    codec::{ContentCodec, normalized_body},
    config::BoardConfig,
    env::Environment,
    error::BoardError,
    keys::{KeyAccess, KeyBindingResolver, KeyCache, KeyScope},
    options::{
        ChannelListOptions, ChannelOptions, ContentOptions, DeleteOptions, ImageFile, ImageOptions,
    },
    pagination::{Page, PageSource},
    services::Services,
};

/// Metadata key holding an image record's display name.
pub const DISPLAY_NAME_KEY: &str = "displayName";

/// Page of decrypted content records.
pub type ContentPage<E, S> = Page<ContentSource<E, S>>;

/// Page of channels.
pub type ChannelPage<E, S> = Page<ChannelSource<E, S>>;

/// Client state shared by the facade and its page sources.
struct ClientInner<E, S> {
    identity: UserId,
    services: S,
    codec: ContentCodec<E>,
    keys: KeyCache,
    config: BoardConfig,
}

impl<E: Environment, S: Services> ClientInner<E, S> {
    fn resolver(&self) -> KeyBindingResolver<'_, S> {
        KeyBindingResolver::new(&self.services, &self.identity)
    }

    async fn key_material(&self, key_url: &str, access: KeyAccess) -> Result<KeyMaterial, BoardError> {
        self.keys.get_or_fetch(&self.services, &self.identity, key_url, access).await
    }

    /// Current content key URL of a channel. A refusal also empties the key
    /// cache.
    async fn content_key_url(&self, channel: &Channel) -> Result<String, BoardError> {
        let result = self.resolver().resolve_key(channel, KeyScope::Content).await;

        if let Err(err) = &result {
            if err.is_authorization_failure() {
                let evicted = self.keys.clear();
                warn!(channel_id = %channel.channel_id, evicted, "content key refused");
            }
        }
        result
    }

    /// Decryption material re-checked with the KMS, for envelopes the caller
    /// brought rather than ones just listed by the service.
    async fn refreshed_key(&self, key_url: &str) -> Result<KeyMaterial, BoardError> {
        self.keys.refresh(&self.services, &self.identity, key_url, KeyAccess::Decrypt).await
    }

    async fn decrypt_envelope(&self, envelope: &EncryptedContent) -> Result<ContentBody, BoardError> {
        let material = self.key_material(&envelope.encryption_key_url, KeyAccess::Decrypt).await?;
        self.codec.decrypt_record(&material, envelope)
    }

    async fn decrypt_stored(&self, stored: &StoredContent) -> Result<ContentRecord, BoardError> {
        let body = self.decrypt_envelope(&stored.content).await?;
        Ok(ContentRecord::from_parts(stored, body))
    }
}

/// Decrypting view over a channel's content collection.
pub struct ContentSource<E, S> {
    inner: Arc<ClientInner<E, S>>,
    channel_id: String,
    kms_resource_url: String,
}

impl<E: Environment, S: Services> PageSource for ContentSource<E, S> {
    type Item = ContentRecord;

    async fn fetch(
        &self,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<RawPage<ContentRecord>, BoardError> {
        let inner = &self.inner;
        let raw = inner
            .services
            .list_contents(&inner.identity, &self.channel_id, cursor, limit)
            .await
            .map_err(|err| match err {
                // Revoked mid-walk reads the same as revoked before the first page
                ServiceError::Denied { reason } => {
                    BoardError::DecryptionDenied { key_url: self.kms_resource_url.clone(), reason }
                },
                other => BoardError::from(other),
            })?;

        let mut items = Vec::with_capacity(raw.items.len());
        for stored in &raw.items {
            items.push(inner.decrypt_stored(stored).await?);
        }

        debug!(channel_id = %self.channel_id, count = items.len(), has_next = raw.next.is_some(), "fetched contents");
        Ok(RawPage { items, next: raw.next })
    }
}

/// View over the channels linked to one conversation.
pub struct ChannelSource<E, S> {
    inner: Arc<ClientInner<E, S>>,
    acl_url_link: String,
    kind: Option<String>,
}

impl<E: Environment, S: Services> PageSource for ChannelSource<E, S> {
    type Item = Channel;

    async fn fetch(&self, cursor: Option<&Cursor>, limit: usize) -> Result<RawPage<Channel>, BoardError> {
        let inner = &self.inner;
        let mut raw = inner
            .services
            .list_channels(&inner.identity, &self.acl_url_link, self.kind.as_deref(), cursor, limit)
            .await?;

        // Services that ignore the kind filter still return the right set
        if let Some(kind) = &self.kind {
            raw.items.retain(|channel| &channel.kind == kind);
        }

        Ok(raw)
    }
}

/// Participant-scoped client for the board store.
///
/// Cheap to clone; clones share the key cache.
pub struct BoardClient<E, S> {
    inner: Arc<ClientInner<E, S>>,
}

impl<E, S> Clone for BoardClient<E, S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<E: Environment, S: Services> BoardClient<E, S> {
    /// Client for `identity` with default configuration.
    pub fn new(identity: UserId, env: E, services: S) -> Self {
        Self::with_config(identity, env, services, BoardConfig::default())
    }

    /// Client for `identity` with explicit configuration.
    pub fn with_config(identity: UserId, env: E, services: S, config: BoardConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                identity,
                services,
                codec: ContentCodec::new(env),
                keys: KeyCache::new(),
                config,
            }),
        }
    }

    /// Participant this client acts for.
    pub fn identity(&self) -> &UserId {
        &self.inner.identity
    }

    /// Client configuration.
    pub fn config(&self) -> &BoardConfig {
        &self.inner.config
    }

    /// Number of key URLs with cached material.
    pub fn cached_keys(&self) -> usize {
        self.inner.keys.len()
    }

    /// Create a channel in a conversation.
    ///
    /// The channel gets its own KMS resource bound to the conversation's ACL,
    /// so neither its resource nor its default key is shared with the
    /// conversation.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the requester is not a participant
    /// - `KeyUnavailable` if the KMS refuses to mint a resource
    pub async fn create_channel(
        &self,
        conversation: &Conversation,
        options: ChannelOptions,
    ) -> Result<Channel, BoardError> {
        let inner = &self.inner;
        let acl_url = inner.services.resolve_acl(&inner.identity, &conversation.id).await?;
        let resource = inner
            .services
            .mint_resource(&inner.identity, &acl_url)
            .await
            .map_err(|err| BoardError::key_unavailable(&acl_url, err))?;

        let request = NewChannel {
            acl_url_link: acl_url,
            kms_resource_url: resource.resource_url,
            default_encryption_key_url: resource.default_key_url,
            kind: options.kind.unwrap_or_else(|| DEFAULT_CHANNEL_KIND.to_string()),
        };
        let channel = inner.services.create_channel(&inner.identity, request).await?;

        info!(channel_id = %channel.channel_id, kind = %channel.kind, "created channel");
        Ok(channel)
    }

    /// Current metadata of a channel.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the channel was deleted
    pub async fn get_channel(&self, channel: &Channel) -> Result<Channel, BoardError> {
        let inner = &self.inner;
        Ok(inner.services.get_channel(&inner.identity, &channel.channel_id).await?)
    }

    /// First page of the conversation's channels, in creation order.
    ///
    /// With no `kind` every flavor is listed.
    pub async fn get_channels(
        &self,
        conversation: &Conversation,
        options: ChannelListOptions,
    ) -> Result<ChannelPage<E, S>, BoardError> {
        let limit = options.channels_limit.unwrap_or(self.inner.config.channels_limit);
        let source = ChannelSource {
            inner: Arc::clone(&self.inner),
            acl_url_link: conversation.acl_url.clone(),
            kind: options.kind,
        };

        Page::first(Arc::new(source), limit).await
    }

    /// Encrypt and append records, in order, as one atomic batch.
    ///
    /// Returns the created records as a single complete page. A successful
    /// append marks the channel active.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `records` is empty
    /// - `KeyUnavailable` if the channel key cannot be resolved
    /// - `ChannelLocked` if the channel is locked for deletion
    pub async fn add_content(
        &self,
        channel: &Channel,
        records: Vec<NewContent>,
    ) -> Result<ContentPage<E, S>, BoardError> {
        if records.is_empty() {
            return Err(BoardError::invalid("no records to add"));
        }

        let inner = &self.inner;
        let key_url = inner.content_key_url(channel).await?;
        let envelopes = self.encrypt_contents(&key_url, &records).await?;

        let stored =
            inner.services.add_contents(&inner.identity, &channel.channel_id, envelopes).await?;
        if stored.len() != records.len() {
            return Err(BoardError::Service {
                reason: format!("stored {} of {} records", stored.len(), records.len()),
            });
        }

        let items: Vec<ContentRecord> = stored
            .iter()
            .zip(&records)
            .map(|(stored, record)| ContentRecord::from_parts(stored, normalized_body(record)))
            .collect();

        info!(channel_id = %channel.channel_id, count = items.len(), "added contents");
        let limit = items.len();
        Ok(Page::complete(Arc::new(self.content_source(channel)), items, limit))
    }

    /// First page of a channel's records, decrypted, in insertion order.
    ///
    /// # Errors
    ///
    /// - `DecryptionDenied` if the requester may no longer read the channel
    /// - `Malformed` if a stored envelope fails to open
    /// - `NotFound` if the channel was deleted
    pub async fn get_contents(
        &self,
        channel: &Channel,
        options: ContentOptions,
    ) -> Result<ContentPage<E, S>, BoardError> {
        let limit = options.contents_limit.unwrap_or(self.inner.config.contents_limit);
        self.inner.content_key_url(channel).await.map_err(BoardError::into_read_denial)?;

        Page::first(Arc::new(self.content_source(channel)), limit).await
    }

    /// Remove every record from a channel.
    ///
    /// # Errors
    ///
    /// - `ChannelLocked` if the channel is locked for deletion
    pub async fn delete_all_content(&self, channel: &Channel) -> Result<(), BoardError> {
        let inner = &self.inner;
        inner.services.delete_all_contents(&inner.identity, &channel.channel_id).await?;

        info!(channel_id = %channel.channel_id, "deleted all contents");
        Ok(())
    }

    /// Seal records under `key_url` without storing them.
    ///
    /// # Errors
    ///
    /// - `KeyUnavailable` if the KMS refuses the key
    pub async fn encrypt_contents(
        &self,
        key_url: &str,
        records: &[NewContent],
    ) -> Result<Vec<EncryptedContent>, BoardError> {
        let inner = &self.inner;
        let material = inner.key_material(key_url, KeyAccess::Encrypt).await?;

        records.iter().map(|record| inner.codec.encrypt_record(key_url, &material, record)).collect()
    }

    /// Open envelopes, each with the key named in it.
    ///
    /// # Errors
    ///
    /// - `DecryptionDenied` if the KMS refuses any key
    /// - `Malformed` if any envelope fails to open
    pub async fn decrypt_contents(
        &self,
        envelopes: &[EncryptedContent],
    ) -> Result<Vec<ContentBody>, BoardError> {
        let inner = &self.inner;
        let mut checked: HashMap<&str, KeyMaterial> = HashMap::new();
        let mut bodies = Vec::with_capacity(envelopes.len());

        for envelope in envelopes {
            let key_url = envelope.encryption_key_url.as_str();
            let material = match checked.get(key_url) {
                Some(material) => material.clone(),
                None => {
                    let material = inner.refreshed_key(key_url).await?;
                    checked.insert(key_url, material.clone());
                    material
                },
            };
            bodies.push(inner.codec.decrypt_record(&material, envelope)?);
        }

        debug!(count = bodies.len(), keys = checked.len(), "decrypted contents");
        Ok(bodies)
    }

    /// Encrypt and upload a file, returning the reference to it.
    pub async fn upload_image(&self, channel: &Channel, file: &ImageFile) -> Result<Scr, BoardError> {
        let inner = &self.inner;
        let mut pending = inner.codec.encrypt_blob(&file.bytes);
        let ciphertext = std::mem::take(&mut pending.ciphertext);

        let loc = inner.services.upload(&inner.identity, ciphertext).await?;

        debug!(channel_id = %channel.channel_id, size = file.size(), "uploaded blob");
        Ok(pending.into_scr(loc))
    }

    /// Upload a file and make it the channel's snapshot image.
    ///
    /// The reference is sealed under the channel's default key so every
    /// participant can open it with [`decrypt_scr`](Self::decrypt_scr).
    ///
    /// # Errors
    ///
    /// - `KeyUnavailable` if the channel's default key is refused
    /// - `ChannelLocked` if the channel is locked for deletion
    pub async fn set_snapshot_image(
        &self,
        channel: &Channel,
        file: &ImageFile,
    ) -> Result<ChannelImage, BoardError> {
        let inner = &self.inner;
        let scr = self.upload_image(channel, file).await?;

        let key_url = inner.resolver().resolve_key(channel, KeyScope::Metadata).await?;
        let material = inner.key_material(&key_url, KeyAccess::Encrypt).await?;
        let sealed = inner.codec.seal_scr(&key_url, &material, &scr)?;

        let image = ChannelImage {
            encryption_key_url: key_url,
            scr: sealed,
            mime_type: file.mime_type.clone(),
            file_size: file.size(),
        };
        inner.services.set_image(&inner.identity, &channel.channel_id, image.clone()).await?;

        info!(channel_id = %channel.channel_id, size = image.file_size, "set snapshot image");
        Ok(image)
    }

    /// Upload a file and append it as a `FILE` record.
    pub async fn add_image(
        &self,
        channel: &Channel,
        file: &ImageFile,
        options: ImageOptions,
    ) -> Result<ContentPage<E, S>, BoardError> {
        let scr = self.upload_image(channel, file).await?;

        let mut record = NewContent::new(FILE_CONTENT_TYPE, "").with_file(FileRef {
            scr,
            mime_type: file.mime_type.clone(),
            size: file.size(),
        });
        if let Some(name) = options.display_name {
            record = record.with_metadata(DISPLAY_NAME_KEY, name);
        }

        self.add_content(channel, vec![record]).await
    }

    /// Download and decrypt the blob an SCR points to.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the blob store has nothing at the location
    /// - `IntegrityMismatch` if the downloaded bytes were altered
    pub async fn download(&self, scr: &Scr) -> Result<Vec<u8>, BoardError> {
        let inner = &self.inner;
        let ciphertext = inner.services.fetch(&inner.identity, &scr.loc).await?;
        inner.codec.decrypt_blob(scr, &ciphertext)
    }

    /// Open an SCR sealed under `key_url`, such as a channel's snapshot image.
    ///
    /// # Errors
    ///
    /// - `DecryptionDenied` if the KMS refuses the key
    /// - `Malformed` if the sealed bytes fail to open
    pub async fn decrypt_scr(&self, key_url: &str, sealed: &SealedScr) -> Result<Scr, BoardError> {
        let inner = &self.inner;
        let material = inner.refreshed_key(key_url).await?;
        inner.codec.open_scr(key_url, &material, sealed)
    }

    /// Lock a channel so that every further write is rejected.
    pub async fn lock_channel_for_deletion(&self, channel: &Channel) -> Result<Channel, BoardError> {
        let inner = &self.inner;
        let locked = inner.services.lock_for_deletion(&inner.identity, &channel.channel_id).await?;

        info!(channel_id = %channel.channel_id, "locked channel for deletion");
        Ok(locked)
    }

    /// Mark a channel active.
    ///
    /// # Errors
    ///
    /// - `ChannelLocked` if the channel is locked for deletion
    pub async fn keep_active(&self, channel: &Channel) -> Result<Channel, BoardError> {
        let inner = &self.inner;
        Ok(inner.services.keep_active(&inner.identity, &channel.channel_id).await?)
    }

    /// Delete a channel of a conversation.
    ///
    /// # Errors
    ///
    /// - `ChannelActive` if `prevent_delete_active_channel` is set and the
    ///   channel is active
    pub async fn delete_channel(
        &self,
        conversation: &Conversation,
        channel: &Channel,
        options: DeleteOptions,
    ) -> Result<(), BoardError> {
        let inner = &self.inner;
        inner
            .services
            .delete_channel(
                &inner.identity,
                &conversation.acl_url,
                &channel.channel_id,
                options.prevent_delete_active_channel,
            )
            .await?;

        info!(channel_id = %channel.channel_id, "deleted channel");
        Ok(())
    }

    /// Liveness probe of the board service.
    pub async fn ping(&self) -> Result<(), BoardError> {
        Ok(self.inner.services.ping().await?)
    }

    /// Leave a conversation and forget every cached key.
    pub async fn leave_conversation(&self, conversation: &Conversation) -> Result<(), BoardError> {
        let inner = &self.inner;
        inner.services.leave(&inner.identity, &conversation.id).await?;

        let evicted = inner.keys.clear();
        info!(conversation_id = %conversation.id, evicted, "left conversation");
        Ok(())
    }

    /// Forget every cached key. Returns how many were evicted.
    pub fn clear_key_cache(&self) -> usize {
        self.inner.keys.clear()
    }

    fn content_source(&self, channel: &Channel) -> ContentSource<E, S> {
        ContentSource {
            inner: Arc::clone(&self.inner),
            channel_id: channel.channel_id.clone(),
            kms_resource_url: channel.kms_resource_url.clone(),
        }
    }
}
