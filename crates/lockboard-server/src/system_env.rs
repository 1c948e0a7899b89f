//! Production Environment implementation using the OS RNG.
//!
//! `SystemEnv` draws channel ids, content ids, nonces and blob keys from
//! getrandom. Not reproducible; tests that need determinism use the seeded
//! simulation environment instead.

use lockboard_core::Environment;

/// Production environment using cryptographic RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. A service without functioning cryptographic
/// randomness cannot mint ids or nonces safely.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - service cannot operate securely");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_are_random() {
        let env = SystemEnv::new();

        let mut bytes1 = [0u8; 32];
        let mut bytes2 = [0u8; 32];

        env.random_bytes(&mut bytes1);
        env.random_bytes(&mut bytes2);

        // Extremely unlikely to be equal if random
        assert_ne!(bytes1, bytes2, "Random bytes should differ");
    }

    #[test]
    fn ids_do_not_repeat() {
        let env = SystemEnv::new();
        assert_ne!(env.random_u128(), env.random_u128());
    }
}
