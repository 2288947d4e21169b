//! Vault error types.
//!
//! Every failure a caller of [`crate::VaultEngine`] or
//! [`crate::EncryptedIndex`] can observe. Variants carry positions, lengths and
//! timings only; raw keywords and key bytes never appear in an error.

use std::time::Duration;

use sovereign_crypto::{CryptoError, KeywordError};
use thiserror::Error;

use crate::{config::ConfigError, storage::StorageError};

/// Errors that can occur during vault operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Secret key has the wrong length.
    ///
    /// Checked before any keyword is processed. Fatal for the call; retrying
    /// with the same key cannot succeed.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Configured key length in bytes
        expected: usize,
        /// Length of the supplied key
        actual: usize,
    },

    /// `add_document` or `remove_document` was called with no keywords.
    #[error("keyword set is empty")]
    EmptyKeywordSet,

    /// A keyword failed normalization. Nothing was mutated.
    #[error("invalid keyword at position {position}: {reason}")]
    InvalidKeyword {
        /// Index of the keyword in the request
        position: usize,
        /// Why normalization failed
        reason: KeywordError,
    },

    /// Durable write did not complete within the configured bound.
    ///
    /// The write keeps running in the background and holds its shards until
    /// it settles. If it lands, memory is updated to match storage; if it
    /// fails, memory is unchanged. Retrying is safe because index mutations
    /// are idempotent.
    #[error("persistence timed out after {timeout:?}")]
    PersistenceTimeout {
        /// The bound that expired
        timeout: Duration,
    },

    /// Index or engine configuration is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which setting was rejected
        reason: String,
    },

    /// Storage backend failed. See [`StorageError`] for retryability.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl VaultError {
    /// Returns true if the same call may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PersistenceTimeout { .. } => true,
            Self::Storage(err) => err.is_transient(),
            Self::InvalidKeyLength { .. }
            | Self::EmptyKeywordSet
            | Self::InvalidKeyword { .. }
            | Self::InvalidConfig { .. } => false,
        }
    }
}

impl From<CryptoError> for VaultError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidKeyLength { expected, actual } => {
                Self::InvalidKeyLength { expected, actual }
            },
            CryptoError::InvalidKeyword { position, reason } => {
                Self::InvalidKeyword { position, reason }
            },
        }
    }
}

impl From<ConfigError> for VaultError {
    fn from(err: ConfigError) -> Self {
        let reason = match err {
            ConfigError::Invalid(reason) => reason,
            other => other.to_string(),
        };
        Self::InvalidConfig { reason }
    }
}
