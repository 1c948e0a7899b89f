//! Key binding and key material caching.
//!
//! [`KeyBindingResolver`] answers "which key protects this channel", asking
//! the KMS every time. [`KeyCache`] remembers the material behind key URLs so
//! reading a long channel fetches each key once.
//!
//! # Invariants
//!
//! - Resolution is never cached: a participant who lost access fails to
//!   resolve even if material from an earlier read is still cached
//! - The cache is only written after a successful fetch
//! - Opening caller-supplied envelopes or SCRs re-checks each key with the KMS
//!   once per call; the cache alone never grants a read
//! - Any KMS denial empties the cache, since it means membership changed

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use lockboard_proto::{Channel, KeyMaterial, UserId};
use tracing::debug;

use crate::{error::BoardError, services::KeyManagement};

/// Which key of a channel is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// Current key of the channel's KMS resource, for content records
    Content,
    /// The channel's fixed default key, for channel metadata such as the
    /// snapshot image
    Metadata,
}

/// What the fetched material will be used for. Decides how a denial is
/// reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAccess {
    /// Sealing new data; denial is `KeyUnavailable`
    Encrypt,
    /// Opening existing data; denial is `DecryptionDenied`
    Decrypt,
}

/// Maps a channel to the key URL protecting it, for one requester.
pub struct KeyBindingResolver<'a, K> {
    kms: &'a K,
    requester: &'a UserId,
}

impl<'a, K: KeyManagement> KeyBindingResolver<'a, K> {
    /// Resolver acting on behalf of `requester`.
    pub fn new(kms: &'a K, requester: &'a UserId) -> Self {
        Self { kms, requester }
    }

    /// Key URL for `channel` in the given scope.
    ///
    /// # Errors
    ///
    /// - `KeyUnavailable` if the KMS refuses to resolve the channel's resource
    ///   for this requester
    pub async fn resolve_key(&self, channel: &Channel, scope: KeyScope) -> Result<String, BoardError> {
        match scope {
            KeyScope::Metadata => Ok(channel.default_encryption_key_url.clone()),
            KeyScope::Content => self
                .kms
                .resolve(self.requester, &channel.kms_resource_url)
                .await
                .map_err(|err| BoardError::key_unavailable(&channel.kms_resource_url, err)),
        }
    }
}

/// Key URL to key material cache.
#[derive(Debug, Default)]
pub struct KeyCache {
    keys: Mutex<HashMap<String, KeyMaterial>>,
}

impl KeyCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached material for a key URL.
    pub fn get(&self, key_url: &str) -> Option<KeyMaterial> {
        self.keys().get(key_url).cloned()
    }

    /// Remember material for a key URL.
    pub fn insert(&self, key_url: impl Into<String>, material: KeyMaterial) {
        self.keys().insert(key_url.into(), material);
    }

    /// Drop every cached key. Returns how many were evicted.
    pub fn clear(&self) -> usize {
        let mut keys = self.keys();
        let evicted = keys.len();
        keys.clear();
        evicted
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Material for `key_url`, from the cache or fetched from the KMS.
    ///
    /// # Errors
    ///
    /// - `KeyUnavailable` (encrypting) or `DecryptionDenied` (decrypting) if
    ///   the KMS refuses the key; the cache is emptied in that case
    /// - `Service` if the KMS fails
    pub async fn get_or_fetch<K: KeyManagement>(
        &self,
        kms: &K,
        requester: &UserId,
        key_url: &str,
        access: KeyAccess,
    ) -> Result<KeyMaterial, BoardError> {
        if let Some(material) = self.get(key_url) {
            return Ok(material);
        }
        self.refresh(kms, requester, key_url, access).await
    }

    /// Material for `key_url` fetched from the KMS even if cached, so the
    /// requester's access is checked again.
    ///
    /// # Errors
    ///
    /// As for [`Self::get_or_fetch`].
    pub async fn refresh<K: KeyManagement>(
        &self,
        kms: &K,
        requester: &UserId,
        key_url: &str,
        access: KeyAccess,
    ) -> Result<KeyMaterial, BoardError> {
        match kms.fetch_key(requester, key_url).await {
            Ok(material) => {
                self.insert(key_url, material.clone());
                Ok(material)
            },
            Err(err) => {
                let err = match access {
                    KeyAccess::Encrypt => BoardError::key_unavailable(key_url, err),
                    KeyAccess::Decrypt => BoardError::decryption_denied(key_url, err),
                };
                if err.is_authorization_failure() {
                    let evicted = self.clear();
                    debug!(key_url, evicted, "key fetch denied, cache cleared");
                }
                Err(err)
            },
        }
    }

    fn keys(&self) -> MutexGuard<'_, HashMap<String, KeyMaterial>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
