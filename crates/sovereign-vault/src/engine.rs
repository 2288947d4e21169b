//! Vault engine: ingestion and search over the encrypted index.
//!
//! The engine is the only component that sees plaintext keywords and the
//! caller's key, and only for the duration of one call. It derives blind tokens
//! with [`TokenDeriver`] and hands nothing but tokens and document ids to
//! [`EncryptedIndex`].
//!
//! # Confidentiality
//!
//! Log fields and errors carry token fingerprints, document ids, counts,
//! positions and timings. Keywords and key bytes are never logged.

use std::sync::Arc;

use sovereign_crypto::{SecretKey, TokenDeriver};
use tracing::{debug, info};

use crate::{
    config::VaultConfig,
    env::Environment,
    error::VaultError,
    index::EncryptedIndex,
    storage::{DocSet, DocumentId, Storage},
    system_env::SystemEnv,
};

/// Outcome of a search. A miss is a result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// True if at least one document matched
    pub found: bool,
    /// Matching document ids, ascending
    pub doc_ids: DocSet,
    /// Time spent deriving the token and probing the index
    ///
    /// Observability only.
    pub latency_nanos: u64,
}

/// Orchestrates token derivation and index access.
///
/// Cheap to clone; clones share the same index.
#[derive(Clone)]
pub struct VaultEngine<S: Storage, E: Environment = SystemEnv> {
    index: Arc<EncryptedIndex<S>>,
    deriver: TokenDeriver,
    env: E,
}

impl<S: Storage, E: Environment> VaultEngine<S, E> {
    /// Create an engine over an existing index.
    pub fn new(index: Arc<EncryptedIndex<S>>, deriver: TokenDeriver, env: E) -> Self {
        Self { index, deriver, env }
    }

    /// Open the index over `storage` and build an engine from `config`.
    ///
    /// Fails with `InvalidConfig` before touching storage if `config` does
    /// not validate.
    pub fn open(storage: S, config: &VaultConfig, env: E) -> Result<Self, VaultError> {
        config.validate()?;
        let index = EncryptedIndex::open(storage, &config.index)?;
        Ok(Self::new(Arc::new(index), config.token_deriver(), env))
    }

    /// Shared index.
    pub fn index(&self) -> &Arc<EncryptedIndex<S>> {
        &self.index
    }

    /// Token deriver used for every call.
    pub fn deriver(&self) -> &TokenDeriver {
        &self.deriver
    }

    /// Index `doc_id` under every keyword.
    ///
    /// All-or-nothing: every keyword is normalized and derived before the
    /// index is touched, and the index applies all tokens in one durable write.
    /// Re-adding an already indexed pair succeeds without a write.
    ///
    /// # Errors
    ///
    /// - `EmptyKeywordSet` if `keywords` is empty
    /// - `InvalidKeyLength` if `key` has the wrong length
    /// - `InvalidKeyword` with the position of the first bad keyword
    /// - `PersistenceTimeout` / `Storage` if the durable write fails
    pub async fn add_document<K: AsRef<str>>(
        &self,
        doc_id: DocumentId,
        keywords: &[K],
        key: &SecretKey,
    ) -> Result<(), VaultError> {
        if keywords.is_empty() {
            return Err(VaultError::EmptyKeywordSet);
        }

        let tokens = self.deriver.derive_all(keywords, key)?;
        let changed = self.index.insert_batch(&tokens, doc_id).await?;

        info!(doc_id, keywords = tokens.len(), changed, "document indexed");
        Ok(())
    }

    /// Remove `doc_id` from every keyword's entry.
    ///
    /// Administrative inverse of [`Self::add_document`] with the same
    /// validation and atomicity. Entries left without documents are deleted.
    pub async fn remove_document<K: AsRef<str>>(
        &self,
        doc_id: DocumentId,
        keywords: &[K],
        key: &SecretKey,
    ) -> Result<(), VaultError> {
        if keywords.is_empty() {
            return Err(VaultError::EmptyKeywordSet);
        }

        let tokens = self.deriver.derive_all(keywords, key)?;
        let changed = self.index.remove_batch(&tokens, doc_id).await?;

        info!(doc_id, keywords = tokens.len(), changed, "document removed");
        Ok(())
    }

    /// Find the documents indexed under `keyword`.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength` if `key` has the wrong length
    /// - `InvalidKeyword` if `keyword` normalizes to nothing or is too long
    pub async fn search(&self, keyword: &str, key: &SecretKey) -> Result<SearchResult, VaultError> {
        let started = self.env.now();

        let token = self.deriver.derive(keyword, key)?;
        let hit = self.index.lookup(&token).await;

        let elapsed = self.env.now() - started;
        let latency_nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);

        let doc_ids = hit.unwrap_or_default();
        let found = !doc_ids.is_empty();

        debug!(
            token = %token.fingerprint(),
            found,
            matches = doc_ids.len(),
            latency_nanos,
            "search complete"
        );

        Ok(SearchResult { found, doc_ids, latency_nanos })
    }
}
