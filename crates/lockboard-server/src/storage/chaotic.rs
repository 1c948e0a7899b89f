//! Chaotic storage wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations so tests can check that a
//! failed write leaves no partial state behind (a batch is stored whole or not
//! at all, a failed channel update leaves the old metadata).

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use lockboard_proto::{Channel, StoredContent};

use super::{SeqRange, Storage, StorageError};

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying storage implementation but fails operations
/// with probability `failure_rate`, before they reach the inner storage.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Operations attempted
    operations: Arc<AtomicUsize>,
    /// Operations failed on purpose
    injected: Arc<AtomicUsize>,
}

/// Linear congruential generator; reproducible for a given seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Wrap `inner`, failing with probability `failure_rate` (clamped to
    /// [0.0, 1.0]).
    pub fn new(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operations: Arc::new(AtomicUsize::new(0)),
            injected: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying storage (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of storage operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::Relaxed)
    }

    /// Number of operations that were failed on purpose.
    pub fn injected_failures(&self) -> usize {
        self.injected.load(Ordering::Relaxed)
    }

    /// Count the operation and decide whether it fails.
    fn roll(&self) -> Result<(), StorageError> {
        self.operations.fetch_add(1, Ordering::Relaxed);

        #[allow(clippy::expect_used)]
        let fail = self.rng.lock().expect("ChaoticRng mutex poisoned").next() < self.failure_rate;
        if fail {
            self.injected.fetch_add(1, Ordering::Relaxed);
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn next_channel_sequence(&self) -> Result<u64, StorageError> {
        self.roll()?;
        self.inner.next_channel_sequence()
    }

    fn create_channel(&self, channel: &Channel) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.create_channel(channel)
    }

    fn update_channel(&self, channel: &Channel) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.update_channel(channel)
    }

    fn load_channel(&self, channel_id: &str) -> Result<Option<Channel>, StorageError> {
        self.roll()?;
        self.inner.load_channel(channel_id)
    }

    fn scan_channels(
        &self,
        range: SeqRange,
        filter: &dyn Fn(&Channel) -> bool,
    ) -> Result<Vec<Channel>, StorageError> {
        self.roll()?;
        self.inner.scan_channels(range, filter)
    }

    fn delete_channel(&self, channel_id: &str) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.delete_channel(channel_id)
    }

    fn next_content_sequence(&self, channel_id: &str) -> Result<u64, StorageError> {
        self.roll()?;
        self.inner.next_content_sequence(channel_id)
    }

    fn append_contents(
        &self,
        channel: &Channel,
        first: u64,
        contents: &[StoredContent],
    ) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.append_contents(channel, first, contents)
    }

    fn load_contents(
        &self,
        channel_id: &str,
        range: SeqRange,
    ) -> Result<Vec<StoredContent>, StorageError> {
        self.roll()?;
        self.inner.load_contents(channel_id, range)
    }

    fn delete_contents(&self, channel_id: &str) -> Result<usize, StorageError> {
        self.roll()?;
        self.inner.delete_contents(channel_id)
    }
}
