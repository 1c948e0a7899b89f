//! Reference board service.
//!
//! Owns channel metadata and content logs. Never sees plaintext: it stores
//! sealed envelopes, enforces the channel lifecycle and issues opaque
//! continuation cursors.
//!
//! All mutations are serialized through one write lock, so sequence numbers
//! are assigned without gaps and a batch lands as one contiguous run.
//!
//! # Cursors
//!
//! A cursor pins the collection it was issued for and the sequence window of
//! the first page: `[from, until)` where `until` is the next free sequence at
//! the time the first page was served. Records appended after that are not
//! part of the walk.

use std::sync::{Arc, Mutex, PoisonError};

use lockboard_core::{ChannelLifecycle, DeleteOptions, Environment, LifecycleError};
use lockboard_proto::{
    ActivityState, Channel, ChannelImage, Cursor, ENVELOPE_VERSION, EncryptedContent, NewChannel,
    RawPage, ServiceError, StoredContent, UserId, from_cbor, to_cbor,
};
use serde::{Deserialize, Serialize};

use crate::storage::{SeqRange, Storage};

/// Default upper bound for page sizes.
pub const DEFAULT_MAX_PAGE_LIMIT: usize = 1000;

/// Default upper bound for records per `add_contents` batch.
pub const DEFAULT_MAX_BATCH: usize = 1000;

/// Board service limits.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Page sizes above this are clamped
    pub max_page_limit: usize,
    /// Larger batches are rejected
    pub max_batch: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { max_page_limit: DEFAULT_MAX_PAGE_LIMIT, max_batch: DEFAULT_MAX_BATCH }
    }
}

/// Conversation membership check.
///
/// The board service trusts the directory for membership; channels inherit
/// access from the conversation ACL they are linked to.
pub trait AccessPolicy: Clone + Send + Sync + 'static {
    /// Returns true if `requester` may access resources linked to `acl_url`.
    fn is_member(&self, requester: &UserId, acl_url: &str) -> bool;
}

/// Policy that admits everyone. Used by the operator tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl AccessPolicy for OpenAccess {
    fn is_member(&self, _requester: &UserId, _acl_url: &str) -> bool {
        true
    }
}

/// Serialized cursor contents.
#[derive(Debug, Serialize, Deserialize)]
struct PageToken {
    /// Collection the token belongs to (channel id or conversation ACL)
    scope: String,
    from: u64,
    until: u64,
}

/// Reference board service over pluggable storage.
///
/// Clone is cheap; clones share storage and the write lock.
#[derive(Clone)]
pub struct BoardService<E: Environment, St: Storage, P: AccessPolicy> {
    env: E,
    storage: St,
    policy: P,
    config: ServiceConfig,
    writes: Arc<Mutex<()>>,
}

impl<E: Environment, St: Storage, P: AccessPolicy> BoardService<E, St, P> {
    /// Create a service with default limits.
    pub fn new(env: E, storage: St, policy: P) -> Self {
        Self::with_config(env, storage, policy, ServiceConfig::default())
    }

    /// Create a service with explicit limits.
    pub fn with_config(env: E, storage: St, policy: P, config: ServiceConfig) -> Self {
        Self { env, storage, policy, config, writes: Arc::new(Mutex::new(())) }
    }

    /// Underlying storage.
    pub fn storage(&self) -> &St {
        &self.storage
    }

    /// Active limits.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Create a channel linked to a conversation ACL.
    ///
    /// # Errors
    ///
    /// - `Denied` if the requester is not a member of `acl_url_link`
    /// - `Invalid` if a required field is empty
    pub fn create_channel(
        &self,
        requester: &UserId,
        request: NewChannel,
    ) -> Result<Channel, ServiceError> {
        if request.kms_resource_url.is_empty() || request.default_encryption_key_url.is_empty() {
            return Err(ServiceError::invalid("channel needs a KMS resource and default key"));
        }
        if request.kind.is_empty() {
            return Err(ServiceError::invalid("channel kind must not be empty"));
        }
        self.authorize(requester, &request.acl_url_link)?;

        let _guard = self.write_lock();

        let seq = self.storage.next_channel_sequence()?;
        let channel_id = format!("{:032x}", self.env.random_u128());
        let channel = Channel {
            channel_url: format!("board://channels/{channel_id}"),
            acl_url: format!("acl://channels/{channel_id}"),
            channel_id,
            acl_url_link: request.acl_url_link,
            kms_resource_url: request.kms_resource_url,
            default_encryption_key_url: request.default_encryption_key_url,
            kind: request.kind,
            image: None,
            state: ActivityState::Inactive,
            created_at: seq,
        };
        self.storage.create_channel(&channel)?;

        tracing::info!(channel_id = %channel.channel_id, kind = %channel.kind, seq, "channel created");

        Ok(channel)
    }

    /// Current metadata of a channel.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the channel does not exist
    /// - `Denied` if the requester is not a member of the linked conversation
    pub fn get_channel(&self, requester: &UserId, channel_id: &str) -> Result<Channel, ServiceError> {
        self.load_authorized(requester, channel_id)
    }

    /// One page of the channels linked to `acl_url_link`, in creation order.
    ///
    /// # Errors
    ///
    /// - `Invalid` for a zero limit or a cursor issued for another listing
    /// - `Denied` if the requester is not a member of `acl_url_link`
    pub fn list_channels(
        &self,
        requester: &UserId,
        acl_url_link: &str,
        kind: Option<&str>,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<RawPage<Channel>, ServiceError> {
        let limit = self.page_limit(limit)?;
        self.authorize(requester, acl_url_link)?;

        let (from, until) = match cursor {
            Some(cursor) => decode_cursor(cursor, acl_url_link)?,
            None => (0, self.storage.next_channel_sequence()?),
        };

        let filter = |channel: &Channel| {
            channel.acl_url_link == acl_url_link && kind.is_none_or(|kind| channel.kind == kind)
        };
        let channels =
            self.storage.scan_channels(SeqRange { from, until, limit: limit + 1 }, &filter)?;

        paginate(channels, limit, acl_url_link, until, |channel| channel.created_at)
    }

    /// Append a batch atomically, in submission order.
    ///
    /// The whole batch is validated before anything is stored. The first
    /// write marks the channel active, in the same storage write as the
    /// records.
    ///
    /// # Errors
    ///
    /// - `Invalid` for an empty or oversized batch, or a malformed envelope
    /// - `Locked` if the channel is locked for deletion
    /// - `NotFound` / `Denied` as for [`Self::get_channel`]
    pub fn add_contents(
        &self,
        requester: &UserId,
        channel_id: &str,
        contents: Vec<EncryptedContent>,
    ) -> Result<Vec<StoredContent>, ServiceError> {
        self.validate_batch(&contents)?;

        let _guard = self.write_lock();

        let mut channel = self.load_authorized(requester, channel_id)?;
        let mut lifecycle = ChannelLifecycle::from_state(channel_id, channel.state);
        channel.state = lifecycle.mark_active()?;

        let first = self.storage.next_content_sequence(channel_id)?;
        let stored: Vec<StoredContent> = contents
            .into_iter()
            .enumerate()
            .map(|(offset, content)| StoredContent {
                content_id: format!("{:032x}", self.env.random_u128()),
                channel_id: channel_id.to_string(),
                created_at: first + offset as u64,
                content,
            })
            .collect();
        // Activation commits in the same write as the records
        self.storage.append_contents(&channel, first, &stored)?;

        tracing::debug!(channel_id, first, count = stored.len(), "contents appended");

        Ok(stored)
    }

    /// One page of a channel's contents, in insertion order.
    ///
    /// # Errors
    ///
    /// - `Invalid` for a zero limit or a cursor issued for another channel
    /// - `NotFound` / `Denied` as for [`Self::get_channel`]
    pub fn list_contents(
        &self,
        requester: &UserId,
        channel_id: &str,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<RawPage<StoredContent>, ServiceError> {
        let limit = self.page_limit(limit)?;
        let channel = self.load_authorized(requester, channel_id)?;
        ChannelLifecycle::from_state(channel_id, channel.state).ensure_readable()?;

        let (from, until) = match cursor {
            Some(cursor) => decode_cursor(cursor, channel_id)?,
            None => (0, self.storage.next_content_sequence(channel_id)?),
        };

        let contents =
            self.storage.load_contents(channel_id, SeqRange { from, until, limit: limit + 1 })?;

        paginate(contents, limit, channel_id, until, |content| content.created_at)
    }

    /// Remove every record of a channel. Does not change its activity state.
    ///
    /// # Errors
    ///
    /// - `Locked` if the channel is locked for deletion
    /// - `NotFound` / `Denied` as for [`Self::get_channel`]
    pub fn delete_all_contents(&self, requester: &UserId, channel_id: &str) -> Result<(), ServiceError> {
        let _guard = self.write_lock();

        let channel = self.load_authorized(requester, channel_id)?;
        ChannelLifecycle::from_state(channel_id, channel.state).ensure_writable()?;

        let removed = self.storage.delete_contents(channel_id)?;

        tracing::info!(channel_id, removed, "channel contents deleted");

        Ok(())
    }

    /// Replace a channel's snapshot image.
    ///
    /// # Errors
    ///
    /// - `Invalid` if the image is not sealed under the channel's default key
    /// - `Locked` if the channel is locked for deletion
    /// - `NotFound` / `Denied` as for [`Self::get_channel`]
    pub fn set_image(
        &self,
        requester: &UserId,
        channel_id: &str,
        image: ChannelImage,
    ) -> Result<Channel, ServiceError> {
        let _guard = self.write_lock();

        let mut channel = self.load_authorized(requester, channel_id)?;
        ChannelLifecycle::from_state(channel_id, channel.state).ensure_writable()?;

        if image.encryption_key_url != channel.default_encryption_key_url {
            return Err(ServiceError::invalid(
                "snapshot image must be sealed under the channel default key",
            ));
        }

        channel.image = Some(image);
        self.storage.update_channel(&channel)?;

        tracing::debug!(channel_id, "channel image set");

        Ok(channel)
    }

    /// Lock a channel for deletion. Idempotent.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `Denied` as for [`Self::get_channel`]
    pub fn lock_for_deletion(&self, requester: &UserId, channel_id: &str) -> Result<Channel, ServiceError> {
        self.transition(requester, channel_id, ChannelLifecycle::lock_for_deletion)
    }

    /// Mark a channel active.
    ///
    /// # Errors
    ///
    /// - `Locked` if the channel is locked for deletion
    /// - `NotFound` / `Denied` as for [`Self::get_channel`]
    pub fn keep_active(&self, requester: &UserId, channel_id: &str) -> Result<Channel, ServiceError> {
        self.transition(requester, channel_id, ChannelLifecycle::mark_active)
    }

    /// Delete a channel linked to `acl_url_link`, together with its contents.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the channel does not exist or is linked elsewhere
    /// - `Denied` if the requester is not a member of the linked conversation
    /// - `Active` if `prevent_delete_active` is set and the channel is active
    pub fn delete_channel(
        &self,
        requester: &UserId,
        acl_url_link: &str,
        channel_id: &str,
        prevent_delete_active: bool,
    ) -> Result<(), ServiceError> {
        let _guard = self.write_lock();

        let channel = self.load_authorized(requester, channel_id)?;
        if channel.acl_url_link != acl_url_link {
            return Err(ServiceError::not_found(channel_id));
        }

        let mut lifecycle = ChannelLifecycle::from_state(channel_id, channel.state);
        lifecycle.request_deletion(DeleteOptions {
            prevent_delete_active_channel: prevent_delete_active,
        })?;
        self.storage.delete_channel(channel_id)?;

        tracing::info!(channel_id, "channel deleted");

        Ok(())
    }

    /// Liveness probe.
    ///
    /// # Errors
    ///
    /// `Unavailable` if storage cannot be read.
    pub fn ping(&self) -> Result<(), ServiceError> {
        self.storage.next_channel_sequence()?;
        Ok(())
    }

    fn write_lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorize(&self, requester: &UserId, acl_url: &str) -> Result<(), ServiceError> {
        if self.policy.is_member(requester, acl_url) {
            Ok(())
        } else {
            tracing::debug!(requester = %requester.as_str(), acl_url, "access denied");
            Err(ServiceError::denied(format!("{} is not a member of {acl_url}", requester.as_str())))
        }
    }

    fn load_authorized(&self, requester: &UserId, channel_id: &str) -> Result<Channel, ServiceError> {
        let channel = self
            .storage
            .load_channel(channel_id)?
            .ok_or_else(|| ServiceError::not_found(channel_id))?;
        self.authorize(requester, &channel.acl_url_link)?;
        Ok(channel)
    }

    /// Apply a lifecycle transition and persist the new state.
    fn transition(
        &self,
        requester: &UserId,
        channel_id: &str,
        apply: impl FnOnce(&mut ChannelLifecycle) -> Result<ActivityState, LifecycleError>,
    ) -> Result<Channel, ServiceError> {
        let _guard = self.write_lock();

        let mut channel = self.load_authorized(requester, channel_id)?;
        let mut lifecycle = ChannelLifecycle::from_state(channel_id, channel.state);
        let state = apply(&mut lifecycle)?;

        if channel.state != state {
            tracing::info!(channel_id, from = ?channel.state, to = ?state, "channel state changed");
            channel.state = state;
            self.storage.update_channel(&channel)?;
        }

        Ok(channel)
    }

    fn page_limit(&self, limit: usize) -> Result<usize, ServiceError> {
        if limit == 0 {
            return Err(ServiceError::invalid("page limit must be positive"));
        }
        Ok(limit.min(self.config.max_page_limit))
    }

    fn validate_batch(&self, contents: &[EncryptedContent]) -> Result<(), ServiceError> {
        if contents.is_empty() {
            return Err(ServiceError::invalid("batch must contain at least one record"));
        }
        if contents.len() > self.config.max_batch {
            return Err(ServiceError::invalid(format!(
                "batch of {} exceeds the limit of {}",
                contents.len(),
                self.config.max_batch
            )));
        }

        for (index, content) in contents.iter().enumerate() {
            if content.version != ENVELOPE_VERSION {
                return Err(ServiceError::invalid(format!(
                    "record {index}: unsupported envelope version {}",
                    content.version
                )));
            }
            if content.encryption_key_url.is_empty() {
                return Err(ServiceError::invalid(format!("record {index}: missing encryption key url")));
            }
        }

        Ok(())
    }
}

/// Split an over-fetched slice (`limit + 1` items) into a page and cursor.
fn paginate<T>(
    mut items: Vec<T>,
    limit: usize,
    scope: &str,
    until: u64,
    seq: impl Fn(&T) -> u64,
) -> Result<RawPage<T>, ServiceError> {
    if items.len() <= limit {
        return Ok(RawPage::last(items));
    }

    let from = items.get(limit).map(&seq).unwrap_or(until);
    items.truncate(limit);

    let next = encode_cursor(scope, from, until)?;
    Ok(RawPage { items, next: Some(next) })
}

fn encode_cursor(scope: &str, from: u64, until: u64) -> Result<Cursor, ServiceError> {
    let token = PageToken { scope: scope.to_string(), from, until };
    Ok(Cursor::from_bytes(to_cbor(&token)?))
}

fn decode_cursor(cursor: &Cursor, scope: &str) -> Result<(u64, u64), ServiceError> {
    let token: PageToken = from_cbor(cursor.as_bytes())?;
    if token.scope != scope {
        return Err(ServiceError::invalid("cursor was issued for another collection"));
    }
    if token.from > token.until {
        return Err(ServiceError::invalid("cursor window is inverted"));
    }
    Ok((token.from, token.until))
}
