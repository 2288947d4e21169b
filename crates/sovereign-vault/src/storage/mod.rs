//! Storage abstraction for the encrypted index
//!
//! Trait-based abstraction for persisting index entries (blind token →
//! document ids). The trait is synchronous (no async); the index runs calls on
//! the blocking pool and bounds them with a timeout.

mod chaotic;
mod error;
mod memory;
mod redb;

use std::collections::BTreeSet;

pub use chaotic::ChaoticStorage;
pub use error::StorageError;
pub use memory::MemoryStorage;
use sovereign_crypto::BlindToken;

pub use self::redb::RedbStorage;

/// Caller-supplied document identifier. Opaque to the vault.
pub type DocumentId = u64;

/// Ordered, duplicate-free set of document ids for one token.
pub type DocSet = BTreeSet<DocumentId>;

/// Durable token → document-set store (the vault's persistence adapter).
///
/// Must be Clone (shared by the index and its blocking writes), Send + Sync
/// (thread-safe), and synchronous (no async methods). Implementations
/// typically share internal state via Arc, so clones access the same
/// underlying storage.
///
/// Writing an empty set deletes the entry; the store never holds empty sets.
///
/// # Panics
///
/// Implementations may panic if internal synchronization primitives are
/// poisoned (a thread panicked while holding a lock). Acceptable for
/// test/simulation code, but production implementations should handle poisoned
/// mutexes gracefully.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Replace the document set stored for `token`.
    ///
    /// # Invariants
    ///
    /// - Post: `get(token)` returns `docs`, or `None` if `docs` is empty
    fn put(&self, token: &BlindToken, docs: &DocSet) -> Result<(), StorageError>;

    /// Replace several entries atomically.
    ///
    /// Either every entry is written or none is. Used for the multi-keyword
    /// writes of a single document.
    fn put_many(&self, entries: &[(BlindToken, DocSet)]) -> Result<(), StorageError>;

    /// Load the document set for `token`.
    ///
    /// Returns `None` if no entry exists.
    fn get(&self, token: &BlindToken) -> Result<Option<DocSet>, StorageError>;

    /// List every stored entry.
    ///
    /// Used to rebuild the in-memory index on startup. Order is not
    /// guaranteed.
    fn list_entries(&self) -> Result<Vec<(BlindToken, DocSet)>, StorageError>;
}
