//! Environment abstraction for deterministic testing.
//!
//! Decouples client logic from system randomness. Enables deterministic
//! simulation with a seeded RNG and production use with the OS RNG.

/// Abstract environment providing randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random fixed-size array (nonces, blob keys).
    fn random_array<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes);
        bytes
    }

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        u64::from_be_bytes(self.random_array())
    }

    /// Generates a random `u128`.
    ///
    /// Useful for channel and content ids.
    fn random_u128(&self) -> u128 {
        u128::from_be_bytes(self.random_array())
    }
}
