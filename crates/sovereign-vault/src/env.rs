//! Environment abstraction for deterministic testing.
//!
//! Decouples vault logic from system resources (time, randomness). Tests use a
//! virtual clock and seeded bytes; production uses [`crate::SystemEnv`].

use std::time::Duration;

use sovereign_crypto::SecretKey;
use zeroize::Zeroizing;

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; tests may use a
    /// virtual clock.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - Subsequent calls must return times >= previous calls.
    fn now(&self) -> Self::Instant;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a fresh secret key of `length` bytes.
    ///
    /// The intermediate buffer is zeroized; the caller owns the returned key.
    fn generate_secret_key(&self, length: usize) -> SecretKey {
        let mut bytes = Zeroizing::new(vec![0u8; length]);
        self.random_bytes(&mut bytes);
        SecretKey::from_slice(&bytes)
    }
}
