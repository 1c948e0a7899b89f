//! In-memory encrypted blob store.
//!
//! Stores opaque ciphertext under random location handles. Holding an SCR is
//! the only capability needed to read a blob, so there is no access check.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use lockboard_core::{BlobStore, Environment};
use lockboard_proto::{ServiceError, UserId};

use crate::sim_env::SimEnv;

/// Simulated blob store. Clones share state.
#[derive(Clone)]
pub struct MemoryBlobStore {
    env: SimEnv,
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    /// Empty blob store.
    pub fn new(env: SimEnv) -> Self {
        Self { env, blobs: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Store ciphertext and return its location handle.
    pub fn upload(&self, ciphertext: Vec<u8>) -> String {
        let loc = format!("blob://{:032x}", self.env.random_u128());
        self.lock().insert(loc.clone(), ciphertext);
        loc
    }

    /// Ciphertext stored at `loc`.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is stored there.
    pub fn fetch(&self, loc: &str) -> Result<Vec<u8>, ServiceError> {
        self.lock().get(loc).cloned().ok_or_else(|| ServiceError::not_found(loc))
    }

    /// Flip one bit of a stored blob. Returns false if `loc` is empty.
    pub fn tamper(&self, loc: &str) -> bool {
        match self.lock().get_mut(loc).and_then(|blob| blob.last_mut()) {
            Some(byte) => {
                *byte ^= 0x01;
                true
            },
            None => false,
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing was uploaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.lock().expect("Mutex poisoned")
    }
}

impl BlobStore for MemoryBlobStore {
    async fn upload(&self, _requester: &UserId, ciphertext: Vec<u8>) -> Result<String, ServiceError> {
        Ok(Self::upload(self, ciphertext))
    }

    async fn fetch(&self, _requester: &UserId, loc: &str) -> Result<Vec<u8>, ServiceError> {
        Self::fetch(self, loc)
    }
}
