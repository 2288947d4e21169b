//! Sovereign vault: searchable encrypted keyword index.
//!
//! Stores which documents contain which keywords without ever storing a
//! keyword. Keywords are replaced by blind tokens derived from a caller-held
//! key (see [`sovereign_crypto`]); the index holder sees only tokens and
//! document ids.
//!
//! # Architecture
//!
//! ```text
//! caller ──► VaultEngine ──► TokenDeriver (keyword + key → BlindToken)
//!                 │
//!                 ▼
//!           EncryptedIndex (sharded, in-memory)
//!                 │  write-through, bounded by persist_timeout
//!                 ▼
//!              Storage (MemoryStorage | RedbStorage | ChaoticStorage)
//! ```
//!
//! # Components
//!
//! - [`VaultEngine`]: Ingestion and search; the only place keys are used
//! - [`EncryptedIndex`]: Token → document-set map with durable writes
//! - [`Storage`]: Persistence adapter trait and its implementations
//! - [`VaultConfig`]: TOML-loadable configuration
//! - [`SystemEnv`]: Production environment (real time, crypto RNG)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod engine;
pub mod env;
mod error;
mod index;
pub mod storage;
mod system_env;

pub use config::{ConfigError, IndexConfig, MIN_KEY_LENGTH, VaultConfig};
pub use engine::{SearchResult, VaultEngine};
pub use env::Environment;
pub use error::VaultError;
pub use index::EncryptedIndex;
pub use sovereign_crypto::{BlindToken, SecretKey, TokenDeriver};
pub use storage::{
    ChaoticStorage, DocSet, DocumentId, MemoryStorage, RedbStorage, Storage, StorageError,
};
pub use system_env::SystemEnv;
