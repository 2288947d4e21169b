//! Error types for token derivation

use thiserror::Error;

/// Reasons a raw keyword cannot be normalized.
///
/// Variants never carry the keyword itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeywordError {
    /// Keyword is empty after trimming
    #[error("keyword is empty after normalization")]
    Empty,

    /// Normalized keyword exceeds the configured byte limit
    #[error("keyword too long: {actual} bytes, limit {max}")]
    TooLong {
        /// Configured limit in bytes
        max: usize,
        /// Normalized length in bytes
        actual: usize,
    },
}

/// Errors from token derivation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Secret key does not match the configured length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Configured key length
        expected: usize,
        /// Length of the supplied key
        actual: usize,
    },

    /// A keyword in the request failed normalization
    #[error("invalid keyword at position {position}: {reason}")]
    InvalidKeyword {
        /// Index of the keyword in the request
        position: usize,
        /// Why normalization failed
        reason: KeywordError,
    },
}
