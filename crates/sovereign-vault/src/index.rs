//! Encrypted inverted index.
//!
//! Maps blind tokens to the set of documents that contain the underlying
//! keyword. The index never sees a plaintext keyword; it only compares tokens.
//!
//! # Write-through
//!
//! Every mutation is persisted before memory changes:
//!
//! ```text
//! lock writers (ascending) -> compute new sets -> Storage::put_many -> apply
//!                                                 (blocking pool)
//!                               caller waits at most persist_timeout
//! ```
//!
//! The write and the apply step run in a task that owns the writer locks of
//! every shard it touches. The caller only waits on that task. If the wait
//! times out or the caller drops the future, the task carries on. A write that
//! lands is applied to memory; a failed one leaves memory as it was. The
//! shards are released only after that. A later mutation of the same shards
//! queues behind the pending one, so an abandoned write never lands on top of
//! a newer one and memory converges to storage without a manual refresh.
//!
//! # Concurrency
//!
//! Entries are partitioned into shards by token bytes. Each shard has a
//! writer lock, held for the whole write-through sequence, and a
//! `tokio::sync::RwLock` over its entries, held only while sets are read or
//! swapped in. Lookups therefore never wait on storage. Multi-shard mutations
//! lock in ascending shard order so two batches can never wait on each other.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use sovereign_crypto::{BlindToken, TOKEN_LENGTH};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::{
    config::IndexConfig,
    error::VaultError,
    storage::{DocSet, DocumentId, Storage, StorageError},
};

/// Compared against the queried token when it is absent, so hits and misses do
/// the same comparison work.
const DECOY_TOKEN: BlindToken = BlindToken::from_bytes([0u8; TOKEN_LENGTH]);

type Entries = HashMap<BlindToken, DocSet>;

struct Shard {
    /// Held from computing new sets until the durable write settles
    writer: Arc<Mutex<()>>,
    entries: RwLock<Entries>,
}

impl Shard {
    fn new(entries: Entries) -> Self {
        Self { writer: Arc::new(Mutex::new(())), entries: RwLock::new(entries) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Insert,
    Remove,
}

/// Sharded token → document-set index with write-through persistence.
pub struct EncryptedIndex<S: Storage> {
    shards: Arc<[Shard]>,
    storage: S,
    persist_timeout: Duration,
}

impl<S: Storage> EncryptedIndex<S> {
    /// Open an index over `storage`, loading every durable entry.
    ///
    /// Lookups are served from memory afterwards; storage is only touched by
    /// mutations and [`Self::refresh`]. A zero shard count or write bound is
    /// rejected with `InvalidConfig` before storage is read.
    pub fn open(storage: S, config: &IndexConfig) -> Result<Self, VaultError> {
        config.validate()?;

        let shard_count = config.shard_count;
        let mut maps: Vec<Entries> = (0..shard_count).map(|_| HashMap::new()).collect();

        let mut loaded = 0usize;
        for (token, docs) in storage.list_entries()? {
            if docs.is_empty() {
                continue;
            }
            maps[shard_index(&token, shard_count)].insert(token, docs);
            loaded += 1;
        }

        info!(entries = loaded, shards = shard_count, "encrypted index opened");

        Ok(Self {
            shards: maps.into_iter().map(Shard::new).collect(),
            storage,
            persist_timeout: config.persist_timeout(),
        })
    }

    /// Backing storage handle.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Bound on how long a caller waits for its own durable write.
    ///
    /// Time spent queued behind an earlier write on the same shards is not
    /// counted.
    pub fn persist_timeout(&self) -> Duration {
        self.persist_timeout
    }

    /// Add `doc` to the entry for `token`.
    ///
    /// Returns whether the entry changed. Repeating a pair is a no-op that
    /// performs no storage write.
    pub async fn insert(&self, token: BlindToken, doc: DocumentId) -> Result<bool, VaultError> {
        Ok(self.insert_batch(&[token], doc).await? > 0)
    }

    /// Add `doc` to the entries of every token in one atomic write.
    ///
    /// Returns the number of entries that changed. Duplicate tokens count
    /// once.
    pub async fn insert_batch(
        &self,
        tokens: &[BlindToken],
        doc: DocumentId,
    ) -> Result<usize, VaultError> {
        self.mutate(tokens, doc, Mutation::Insert).await
    }

    /// Remove `doc` from the entry for `token`.
    ///
    /// Returns whether the entry changed. The entry disappears when its last
    /// document is removed.
    pub async fn remove(&self, token: BlindToken, doc: DocumentId) -> Result<bool, VaultError> {
        Ok(self.remove_batch(&[token], doc).await? > 0)
    }

    /// Remove `doc` from the entries of every token in one atomic write.
    pub async fn remove_batch(
        &self,
        tokens: &[BlindToken],
        doc: DocumentId,
    ) -> Result<usize, VaultError> {
        self.mutate(tokens, doc, Mutation::Remove).await
    }

    /// Documents indexed under `token`, or `None` for an unknown token.
    ///
    /// Exact match only. A hit and a miss both perform one hash lookup and one
    /// constant-time token comparison.
    pub async fn lookup(&self, token: &BlindToken) -> Option<DocSet> {
        let entries = self.shards[self.shard_for(token)].entries.read().await;

        let (candidate, docs) = match entries.get_key_value(token) {
            Some((stored, docs)) => (stored, Some(docs)),
            None => (&DECOY_TOKEN, None),
        };

        // BlindToken equality is constant time
        let matched = candidate == token;
        docs.filter(|_| matched).cloned()
    }

    /// Re-read the entry for `token` from storage and replace the in-memory
    /// copy.
    ///
    /// Waits for any write still settling on the token's shard. Useful when
    /// the store was changed by another process. Returns the reconciled
    /// entry.
    pub async fn refresh(&self, token: &BlindToken) -> Result<Option<DocSet>, VaultError> {
        let shard = &self.shards[self.shard_for(token)];
        let _writer = shard.writer.lock().await;

        let storage = self.storage.clone();
        let key = *token;
        let stored = self.bounded(move || storage.get(&key)).await?;

        let mut entries = shard.entries.write().await;
        match &stored {
            Some(docs) if !docs.is_empty() => {
                entries.insert(*token, docs.clone());
            },
            _ => {
                entries.remove(token);
            },
        }

        debug!(token = %token.fingerprint(), present = stored.is_some(), "entry refreshed");
        Ok(stored.filter(|docs| !docs.is_empty()))
    }

    /// Number of entries (distinct tokens).
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in self.shards.iter() {
            total += shard.entries.read().await.len();
        }
        total
    }

    /// Returns true if no token is indexed.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn mutate(
        &self,
        tokens: &[BlindToken],
        doc: DocumentId,
        mutation: Mutation,
    ) -> Result<usize, VaultError> {
        let mut seen = HashSet::with_capacity(tokens.len());
        let unique: Vec<BlindToken> = tokens.iter().copied().filter(|t| seen.insert(*t)).collect();

        // Ascending shard order; every mutation locks the same way
        let shard_ids: BTreeSet<usize> = unique.iter().map(|token| self.shard_for(token)).collect();
        let mut writers: Vec<OwnedMutexGuard<()>> = Vec::with_capacity(shard_ids.len());
        for &index in &shard_ids {
            writers.push(Arc::clone(&self.shards[index].writer).lock_owned().await);
        }

        let mut changes: Vec<(BlindToken, DocSet)> = Vec::with_capacity(unique.len());
        for token in &unique {
            let entries = self.shards[self.shard_for(token)].entries.read().await;
            let mut docs = entries.get(token).cloned().unwrap_or_default();
            let changed = match mutation {
                Mutation::Insert => docs.insert(doc),
                Mutation::Remove => docs.remove(&doc),
            };
            if changed {
                changes.push((*token, docs));
            }
        }

        if changes.is_empty() {
            debug!(doc, tokens = unique.len(), ?mutation, "no entries changed");
            return Ok(0);
        }

        let shards = Arc::clone(&self.shards);
        let storage = self.storage.clone();
        let settle = tokio::spawn(async move {
            let _writers = writers;
            let changed = changes.len();
            let entries = changes.clone();

            let write = tokio::task::spawn_blocking(move || storage.put_many(&entries));
            let written = match write.await {
                Ok(result) => result.map_err(VaultError::from),
                Err(join_err) => {
                    Err(StorageError::Io(format!("storage task failed: {join_err}")).into())
                },
            };
            if let Err(err) = written {
                warn!(doc, entries = changed, ?mutation, error = %err, "durable write failed");
                return Err(err);
            }

            apply(&shards, &shard_ids, changes).await;
            debug!(doc, entries = changed, ?mutation, "index updated");
            Ok(changed)
        });

        match tokio::time::timeout(self.persist_timeout, settle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                Err(StorageError::Io(format!("index task failed: {join_err}")).into())
            },
            Err(_) => {
                warn!(
                    doc,
                    ?mutation,
                    timeout = ?self.persist_timeout,
                    "durable write still pending, settling in background"
                );
                Err(VaultError::PersistenceTimeout { timeout: self.persist_timeout })
            },
        }
    }

    /// Run a storage call on the blocking pool, bounded by `persist_timeout`.
    async fn bounded<T, F>(&self, call: F) -> Result<T, VaultError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(call);
        match tokio::time::timeout(self.persist_timeout, task).await {
            Ok(Ok(result)) => result.map_err(VaultError::from),
            Ok(Err(join_err)) => {
                Err(StorageError::Io(format!("storage task failed: {join_err}")).into())
            },
            Err(_) => Err(VaultError::PersistenceTimeout { timeout: self.persist_timeout }),
        }
    }

    fn shard_for(&self, token: &BlindToken) -> usize {
        shard_index(token, self.shards.len())
    }
}

/// Swap durable sets into memory, locking every touched shard first so
/// readers see the whole batch or none of it.
async fn apply(shards: &[Shard], shard_ids: &BTreeSet<usize>, changes: Vec<(BlindToken, DocSet)>) {
    let mut guards = BTreeMap::new();
    for &index in shard_ids {
        guards.insert(index, shards[index].entries.write().await);
    }

    for (token, docs) in changes {
        let Some(entries) = guards.get_mut(&shard_index(&token, shards.len())) else {
            continue;
        };
        if docs.is_empty() {
            entries.remove(&token);
        } else {
            entries.insert(token, docs);
        }
    }
}

fn shard_index(token: &BlindToken, shard_count: usize) -> usize {
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&token.as_bytes()[..8]);
    (u64::from_le_bytes(prefix) % shard_count as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ChaoticStorage, MemoryStorage};

    fn token(byte: u8) -> BlindToken {
        BlindToken::from_bytes([byte; TOKEN_LENGTH])
    }

    fn docs(ids: &[u64]) -> DocSet {
        ids.iter().copied().collect()
    }

    fn config(shard_count: usize) -> IndexConfig {
        IndexConfig { shard_count, ..IndexConfig::default() }
    }

    impl<S: Storage> EncryptedIndex<S> {
        /// Same in-memory shards over a different store.
        fn with_storage<T: Storage>(self, storage: T) -> EncryptedIndex<T> {
            EncryptedIndex { shards: self.shards, storage, persist_timeout: self.persist_timeout }
        }
    }

    #[tokio::test]
    async fn insert_then_lookup() {
        let index = EncryptedIndex::open(MemoryStorage::new(), &config(4)).unwrap();

        assert!(index.insert(token(1), 1001).await.unwrap());
        assert!(index.insert(token(1), 1002).await.unwrap());

        assert_eq!(index.lookup(&token(1)).await, Some(docs(&[1001, 1002])));
        assert_eq!(index.storage().get(&token(1)).unwrap(), Some(docs(&[1001, 1002])));
    }

    #[tokio::test]
    async fn lookup_unknown_token_is_none() {
        let index = EncryptedIndex::open(MemoryStorage::new(), &config(4)).unwrap();
        index.insert(token(1), 1).await.unwrap();

        assert_eq!(index.lookup(&token(2)).await, None);
        assert_eq!(index.lookup(&DECOY_TOKEN).await, None);
    }

    #[tokio::test]
    async fn zero_token_is_an_ordinary_key() {
        let index = EncryptedIndex::open(MemoryStorage::new(), &config(1)).unwrap();
        index.insert(DECOY_TOKEN, 5).await.unwrap();

        assert_eq!(index.lookup(&DECOY_TOKEN).await, Some(docs(&[5])));
    }

    #[tokio::test]
    async fn repeated_insert_skips_storage() {
        let chaotic = ChaoticStorage::new(MemoryStorage::new(), 0.0);
        let index = EncryptedIndex::open(chaotic, &config(4)).unwrap();

        assert!(index.insert(token(1), 7).await.unwrap());
        let writes = index.storage().operation_count();

        assert!(!index.insert(token(1), 7).await.unwrap());
        assert_eq!(index.storage().operation_count(), writes);
    }

    #[tokio::test]
    async fn insert_batch_dedupes_tokens() {
        let chaotic = ChaoticStorage::new(MemoryStorage::new(), 0.0);
        let index = EncryptedIndex::open(chaotic, &config(4)).unwrap();
        let before = index.storage().operation_count();

        let changed = index.insert_batch(&[token(1), token(2), token(1)], 9).await.unwrap();

        assert_eq!(changed, 2);
        assert_eq!(index.storage().operation_count(), before + 1);
        assert_eq!(index.len().await, 2);
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_untouched() {
        let storage = MemoryStorage::new();
        let index = EncryptedIndex::open(storage.clone(), &config(4)).unwrap();
        index.insert(token(1), 1).await.unwrap();

        let failing = index.with_storage(ChaoticStorage::new(storage.clone(), 1.0));
        let result = failing.insert_batch(&[token(1), token(2)], 2).await;
        assert!(matches!(result, Err(VaultError::Storage(StorageError::Io(_)))));

        assert_eq!(failing.lookup(&token(1)).await, Some(docs(&[1])));
        assert_eq!(failing.lookup(&token(2)).await, None);
        assert_eq!(storage.get(&token(1)).unwrap(), Some(docs(&[1])));
        assert_eq!(storage.get(&token(2)).unwrap(), None);
    }

    #[test]
    fn open_fails_when_storage_fails() {
        let result = EncryptedIndex::open(ChaoticStorage::new(MemoryStorage::new(), 1.0), &config(4));
        assert!(matches!(result, Err(VaultError::Storage(_))));
    }

    #[tokio::test]
    async fn remove_deletes_empty_entries() {
        let index = EncryptedIndex::open(MemoryStorage::new(), &config(4)).unwrap();
        index.insert_batch(&[token(1), token(2)], 10).await.unwrap();
        index.insert(token(1), 11).await.unwrap();

        assert_eq!(index.remove_batch(&[token(1), token(2)], 10).await.unwrap(), 2);

        assert_eq!(index.lookup(&token(1)).await, Some(docs(&[11])));
        assert_eq!(index.lookup(&token(2)).await, None);
        assert_eq!(index.storage().get(&token(2)).unwrap(), None);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn remove_absent_pair_is_noop() {
        let index = EncryptedIndex::open(MemoryStorage::new(), &config(4)).unwrap();

        assert!(!index.remove(token(3), 1).await.unwrap());
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn open_loads_durable_entries() {
        let storage = MemoryStorage::new();
        storage.put(&token(1), &docs(&[1, 2])).unwrap();
        storage.put(&token(2), &docs(&[3])).unwrap();

        let index = EncryptedIndex::open(storage, &config(3)).unwrap();

        assert_eq!(index.len().await, 2);
        assert_eq!(index.lookup(&token(1)).await, Some(docs(&[1, 2])));
    }

    #[tokio::test]
    async fn timed_out_write_settles_into_memory() {
        let storage = MemoryStorage::new();
        let slow = ChaoticStorage::new(storage.clone(), 0.0).with_latency(Duration::from_millis(200));
        let config = IndexConfig { shard_count: 2, persist_timeout_ms: 20 };
        let index = EncryptedIndex::open(storage.clone(), &config).unwrap().with_storage(slow);

        let result = index.insert(token(1), 42).await;
        assert_eq!(result, Err(VaultError::PersistenceTimeout { timeout: Duration::from_millis(20) }));

        // Readers do not wait on the pending write
        assert_eq!(index.lookup(&token(1)).await, None);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(storage.get(&token(1)).unwrap(), Some(docs(&[42])));
        assert_eq!(index.lookup(&token(1)).await, Some(docs(&[42])));
    }

    #[tokio::test]
    async fn timed_out_failing_write_leaves_memory_untouched() {
        let storage = MemoryStorage::new();
        let failing = ChaoticStorage::new(storage.clone(), 1.0).with_latency(Duration::from_millis(100));
        let config = IndexConfig { shard_count: 2, persist_timeout_ms: 10 };
        let index = EncryptedIndex::open(storage.clone(), &config).unwrap().with_storage(failing);

        let result = index.insert(token(1), 42).await;
        assert!(matches!(result, Err(VaultError::PersistenceTimeout { .. })));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(storage.get(&token(1)).unwrap(), None);
        assert_eq!(index.lookup(&token(1)).await, None);
    }

    #[test]
    fn open_rejects_zero_shards_and_zero_timeout() {
        for config in [
            IndexConfig { shard_count: 0, ..IndexConfig::default() },
            IndexConfig { persist_timeout_ms: 0, ..IndexConfig::default() },
        ] {
            let result = EncryptedIndex::open(MemoryStorage::new(), &config);
            assert!(matches!(result, Err(VaultError::InvalidConfig { .. })), "accepted {config:?}");
        }
    }

    #[tokio::test]
    async fn refresh_drops_entries_missing_from_storage() {
        let storage = MemoryStorage::new();
        let index = EncryptedIndex::open(storage.clone(), &config(2)).unwrap();
        index.insert(token(4), 1).await.unwrap();

        storage.put(&token(4), &DocSet::new()).unwrap();

        assert_eq!(index.refresh(&token(4)).await.unwrap(), None);
        assert_eq!(index.lookup(&token(4)).await, None);
    }

    #[test]
    fn shard_index_is_stable_and_in_range() {
        for byte in 0..=255u8 {
            let t = token(byte);
            let shard = shard_index(&t, 7);
            assert!(shard < 7);
            assert_eq!(shard, shard_index(&t, 7));
        }
        assert_eq!(shard_index(&token(9), 1), 0);
    }
}
