//! In-memory key management service.
//!
//! Resources are bound to a conversation ACL at mint time. Every resolve and
//! key fetch re-checks membership against the directory, so a participant who
//! left loses access on their next request.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use lockboard_core::{Environment, KeyManagement};
use lockboard_proto::{KeyMaterial, KmsResource, ServiceError, UserId};

use crate::{directory::MemoryDirectory, sim_env::SimEnv};

struct Resource {
    acl_url: String,
    current_key: String,
}

struct StoredKey {
    resource_url: String,
    material: KeyMaterial,
}

#[derive(Default)]
struct KmsState {
    resources: HashMap<String, Resource>,
    keys: HashMap<String, StoredKey>,
}

/// Simulated KMS backed by a [`MemoryDirectory`].
///
/// Clones share state.
#[derive(Clone)]
pub struct MemoryKms {
    env: SimEnv,
    directory: MemoryDirectory,
    state: Arc<Mutex<KmsState>>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryKms {
    /// KMS that authorizes against `directory`.
    pub fn new(env: SimEnv, directory: MemoryDirectory) -> Self {
        Self {
            env,
            directory,
            state: Arc::new(Mutex::new(KmsState::default())),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of successful key fetches so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Mint a new resource bound to `acl_url`, with one default key.
    ///
    /// # Errors
    ///
    /// `Denied` if the requester is not a member of `acl_url`.
    pub fn mint_resource(&self, requester: &UserId, acl_url: &str) -> Result<KmsResource, ServiceError> {
        self.authorize(requester, acl_url)?;

        let resource_url = format!("kms://resources/{:032x}", self.env.random_u128());
        let key_url = self.new_key(&resource_url);

        self.lock().resources.insert(
            resource_url.clone(),
            Resource { acl_url: acl_url.to_string(), current_key: key_url.clone() },
        );

        tracing::debug!(resource_url, acl_url, "resource minted");
        Ok(KmsResource { resource_url, default_key_url: key_url })
    }

    /// Replace the current key of a resource. Earlier keys stay fetchable.
    ///
    /// # Errors
    ///
    /// `NotFound` if the resource is unknown.
    pub fn rotate(&self, resource_url: &str) -> Result<String, ServiceError> {
        if !self.lock().resources.contains_key(resource_url) {
            return Err(ServiceError::not_found(resource_url));
        }

        let key_url = self.new_key(resource_url);
        if let Some(resource) = self.lock().resources.get_mut(resource_url) {
            resource.current_key.clone_from(&key_url);
        }

        tracing::debug!(resource_url, key_url, "key rotated");
        Ok(key_url)
    }

    /// Current key URL of a resource.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the resource is unknown
    /// - `Denied` if the requester is not a member of the bound ACL
    pub fn resolve(&self, requester: &UserId, resource_url: &str) -> Result<String, ServiceError> {
        let (acl_url, key_url) = {
            let state = self.lock();
            let resource =
                state.resources.get(resource_url).ok_or_else(|| ServiceError::not_found(resource_url))?;
            (resource.acl_url.clone(), resource.current_key.clone())
        };

        self.authorize(requester, &acl_url)?;
        Ok(key_url)
    }

    /// Key material for a key URL.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the key is unknown
    /// - `Denied` if the requester is not a member of the bound ACL
    pub fn fetch_key(&self, requester: &UserId, key_url: &str) -> Result<KeyMaterial, ServiceError> {
        let (acl_url, material) = {
            let state = self.lock();
            let key = state.keys.get(key_url).ok_or_else(|| ServiceError::not_found(key_url))?;
            let resource = state
                .resources
                .get(&key.resource_url)
                .ok_or_else(|| ServiceError::not_found(&key.resource_url))?;
            (resource.acl_url.clone(), key.material.clone())
        };

        self.authorize(requester, &acl_url)?;
        self.fetches.fetch_add(1, Ordering::Relaxed);
        Ok(material)
    }

    fn new_key(&self, resource_url: &str) -> String {
        let key_url = format!("kms://keys/{:032x}", self.env.random_u128());
        let material = KeyMaterial::from_bytes(self.env.random_array());

        self.lock()
            .keys
            .insert(key_url.clone(), StoredKey { resource_url: resource_url.to_string(), material });
        key_url
    }

    fn authorize(&self, requester: &UserId, acl_url: &str) -> Result<(), ServiceError> {
        if self.directory.is_member(requester, acl_url) {
            Ok(())
        } else {
            Err(ServiceError::denied(format!("{requester} may not use keys bound to {acl_url}")))
        }
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, KmsState> {
        self.state.lock().expect("Mutex poisoned")
    }
}

impl KeyManagement for MemoryKms {
    async fn mint_resource(&self, requester: &UserId, acl_url: &str) -> Result<KmsResource, ServiceError> {
        Self::mint_resource(self, requester, acl_url)
    }

    async fn resolve(&self, requester: &UserId, resource_url: &str) -> Result<String, ServiceError> {
        Self::resolve(self, requester, resource_url)
    }

    async fn fetch_key(&self, requester: &UserId, key_url: &str) -> Result<KeyMaterial, ServiceError> {
        Self::fetch_key(self, requester, key_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACL: &str = "acl://conversations/c1";

    fn kms() -> MemoryKms {
        let directory = MemoryDirectory::new();
        directory.register("c1", ACL, [UserId::new("alice")]).unwrap();
        MemoryKms::new(SimEnv::with_seed(1), directory)
    }

    #[test]
    fn members_resolve_and_fetch() {
        let kms = kms();
        let alice = UserId::new("alice");

        let resource = kms.mint_resource(&alice, ACL).unwrap();
        assert_eq!(kms.resolve(&alice, &resource.resource_url).unwrap(), resource.default_key_url);
        kms.fetch_key(&alice, &resource.default_key_url).unwrap();
        assert_eq!(kms.fetch_count(), 1);
    }

    #[test]
    fn outsiders_are_denied() {
        let kms = kms();
        let alice = UserId::new("alice");
        let mallory = UserId::new("mallory");

        let resource = kms.mint_resource(&alice, ACL).unwrap();
        assert!(matches!(kms.mint_resource(&mallory, ACL), Err(ServiceError::Denied { .. })));
        assert!(matches!(kms.resolve(&mallory, &resource.resource_url), Err(ServiceError::Denied { .. })));
        assert!(matches!(
            kms.fetch_key(&mallory, &resource.default_key_url),
            Err(ServiceError::Denied { .. })
        ));
        assert_eq!(kms.fetch_count(), 0);
    }

    #[test]
    fn rotation_keeps_old_keys() {
        let kms = kms();
        let alice = UserId::new("alice");
        let resource = kms.mint_resource(&alice, ACL).unwrap();

        let rotated = kms.rotate(&resource.resource_url).unwrap();

        assert_ne!(rotated, resource.default_key_url);
        assert_eq!(kms.resolve(&alice, &resource.resource_url).unwrap(), rotated);
        assert!(kms.fetch_key(&alice, &resource.default_key_url).is_ok());
        assert!(kms.rotate("kms://resources/unknown").is_err());
    }
}
