//! Chaotic storage wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations and optionally delays them
//! to test error handling, timeouts and recovery. Used for chaos testing to
//! ensure the index never exposes a partial write.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use sovereign_crypto::BlindToken;

use super::{DocSet, Storage, StorageError};

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying storage implementation but randomly fails
/// operations based on a configured failure rate, and can stall every
/// operation for a fixed latency. Uses Arc<Mutex<>> for the RNG state, making
/// it Clone and thread-safe.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// Delay applied before every operation
    latency: Duration,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Operation counter
    operation_count: Arc<Mutex<usize>>,
}

/// Simple deterministic RNG for chaos injection
///
/// Uses linear congruential generator (LCG) for fast, deterministic randomness.
/// This ensures chaos tests are reproducible with the same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }

    /// Check if we should fail (returns true with probability = `failure_rate`)
    fn should_fail(&mut self, failure_rate: f64) -> bool {
        self.next() < failure_rate
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Create a new chaotic storage wrapper
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            latency: Duration::ZERO,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Stall every operation for `latency` before delegating.
    ///
    /// Simulates a slow or unresponsive backend for timeout tests.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Underlying storage (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of storage operations attempted.
    ///
    /// Each call to any storage method increments this counter.
    pub fn operation_count(&self) -> usize {
        #[allow(clippy::expect_used)]
        *self.operation_count.lock().expect("operation_count mutex poisoned")
    }

    /// Count the operation, apply latency, and decide whether it fails.
    fn begin_operation(&self) -> Result<(), StorageError> {
        {
            #[allow(clippy::expect_used)]
            let mut count = self.operation_count.lock().expect("operation_count mutex poisoned");
            *count += 1;
        }

        if !self.latency.is_zero() {
            #[allow(clippy::disallowed_methods)]
            std::thread::sleep(self.latency);
        }

        #[allow(clippy::expect_used)]
        let fail = self.rng.lock().expect("ChaoticRng mutex poisoned").should_fail(self.failure_rate);
        if fail {
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }

        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn put(&self, token: &BlindToken, docs: &DocSet) -> Result<(), StorageError> {
        self.begin_operation()?;
        self.inner.put(token, docs)
    }

    fn put_many(&self, entries: &[(BlindToken, DocSet)]) -> Result<(), StorageError> {
        self.begin_operation()?;
        self.inner.put_many(entries)
    }

    fn get(&self, token: &BlindToken) -> Result<Option<DocSet>, StorageError> {
        self.begin_operation()?;
        self.inner.get(token)
    }

    fn list_entries(&self) -> Result<Vec<(BlindToken, DocSet)>, StorageError> {
        self.begin_operation()?;
        self.inner.list_entries()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::storage::MemoryStorage;

    fn token(byte: u8) -> BlindToken {
        BlindToken::from_bytes([byte; 32])
    }

    fn docs(ids: &[u64]) -> DocSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_chaotic_with_zero_failure_rate() {
        let chaotic = ChaoticStorage::new(MemoryStorage::new(), 0.0);

        // With 0% failure rate, should always succeed
        for i in 0..100u8 {
            chaotic.put(&token(i), &docs(&[u64::from(i)])).expect("should not fail with 0% rate");
        }

        assert_eq!(chaotic.list_entries().expect("list failed").len(), 100);
    }

    #[test]
    fn test_chaotic_with_100_failure_rate() {
        let chaotic = ChaoticStorage::new(MemoryStorage::new(), 1.0);

        // With 100% failure rate, should always fail
        assert!(chaotic.put(&token(1), &docs(&[1])).is_err());
        assert!(chaotic.put_many(&[(token(1), docs(&[1]))]).is_err());
        assert!(chaotic.get(&token(1)).is_err());
        assert!(chaotic.list_entries().is_err());
        assert_eq!(chaotic.inner().entry_count(), 0);
    }

    #[test]
    fn test_chaotic_deterministic_with_seed() {
        let chaotic1 = ChaoticStorage::with_seed(MemoryStorage::new(), 0.5, 42);
        let chaotic2 = ChaoticStorage::with_seed(MemoryStorage::new(), 0.5, 42);

        // Same seed should produce same failure pattern
        for i in 0..100u8 {
            let result1 = chaotic1.put(&token(i), &docs(&[1]));
            let result2 = chaotic2.put(&token(i), &docs(&[1]));

            assert_eq!(result1.is_ok(), result2.is_ok(), "determinism violated at iteration {i}");
        }
    }

    #[test]
    fn test_chaotic_accesses_underlying_storage() {
        let chaotic = ChaoticStorage::new(MemoryStorage::new(), 0.0);

        chaotic.put(&token(1), &docs(&[1001])).expect("put failed");

        // Check that inner storage actually has the entry
        assert_eq!(chaotic.inner().get(&token(1)).expect("get failed"), Some(docs(&[1001])));
    }

    #[test]
    fn test_operation_count() {
        let chaotic = ChaoticStorage::new(MemoryStorage::new(), 1.0);

        let _ = chaotic.put(&token(1), &docs(&[1]));
        let _ = chaotic.get(&token(1));
        let _ = chaotic.list_entries();

        assert_eq!(chaotic.operation_count(), 3);
    }

    #[test]
    fn test_latency_delays_operations() {
        let chaotic = ChaoticStorage::new(MemoryStorage::new(), 0.0)
            .with_latency(Duration::from_millis(20));

        #[allow(clippy::disallowed_methods)]
        let start = Instant::now();
        chaotic.get(&token(1)).unwrap();

        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    #[should_panic(expected = "failure_rate must be between 0.0 and 1.0")]
    fn test_chaotic_rejects_invalid_failure_rate() {
        let _chaotic = ChaoticStorage::new(MemoryStorage::new(), 1.5); // Invalid!
    }
}
