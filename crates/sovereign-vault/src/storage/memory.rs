#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use sovereign_crypto::BlindToken;

use super::{DocSet, Storage, StorageError};

/// In-memory storage implementation for testing and ephemeral vaults
///
/// Uses `HashMap` keyed by token. All state is wrapped in Arc<Mutex<>> to allow
/// Clone and concurrent access. Thread-safe through Mutex, but uses
/// `lock().expect()` which will panic if the mutex is poisoned - acceptable for
/// test code. `put_many` holds the lock for the whole batch, which makes it
/// atomic.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<HashMap<BlindToken, DocSet>>>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    ///
    /// Useful for debugging and testing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked while
    /// holding the lock). This is acceptable for test/simulation code.
    #[allow(clippy::expect_used)]
    pub fn entry_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").len()
    }

    /// Total number of (token, document) pairs across all entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn posting_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").values().map(DocSet::len).sum()
    }
}

fn write_entry(map: &mut HashMap<BlindToken, DocSet>, token: &BlindToken, docs: &DocSet) {
    if docs.is_empty() {
        map.remove(token);
    } else {
        map.insert(*token, docs.clone());
    }
}

impl Storage for MemoryStorage {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn put(&self, token: &BlindToken, docs: &DocSet) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        write_entry(&mut inner, token, docs);
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn put_many(&self, entries: &[(BlindToken, DocSet)]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        for (token, docs) in entries {
            write_entry(&mut inner, token, docs);
        }
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn get(&self, token: &BlindToken) -> Result<Option<DocSet>, StorageError> {
        Ok(self.inner.lock().expect("Mutex poisoned").get(token).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn list_entries(&self) -> Result<Vec<(BlindToken, DocSet)>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.iter().map(|(token, docs)| (*token, docs.clone())).collect())
    }
}
