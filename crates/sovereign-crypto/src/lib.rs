//! SovereignVault Cryptographic Primitives
//!
//! Cryptographic building blocks for the vault. Pure functions with
//! deterministic outputs and no I/O. Callers own the secret key; nothing in
//! this crate persists or logs it.
//!
//! # Token Derivation
//!
//! A keyword never reaches the index in plaintext. It is normalized, then
//! replaced by a blind token computed with a keyed PRF under an index key that
//! is itself derived from the caller's secret key.
//!
//! ```text
//! Secret Key (caller-held, fixed length)
//!        │
//!        ▼
//! HKDF-SHA256 → Index Key (per call, zeroized after use)
//!        │
//!        ▼
//! Normalized Keyword ──► HMAC-SHA256 → Blind Token (32 bytes)
//! ```
//!
//! # Security
//!
//! Dictionary resistance:
//! - Tokens are HMAC outputs; guessing a keyword requires the secret key
//! - No structure of the keyword (length, prefix, case) survives in the token
//!
//! Determinism:
//! - Same (keyword, key) always yields the same token so the index can be
//!   queried later
//!
//! Timing:
//! - Token and key equality are constant time
//! - Key material is zeroized when dropped

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod derivation;
mod error;
mod key;
mod normalize;
mod token;

pub use derivation::{INDEX_KEY_LABEL, TokenDeriver};
pub use error::{CryptoError, KeywordError};
pub use key::{SECRET_KEY_LENGTH, SecretKey};
pub use normalize::{
    CaseFolding, DEFAULT_MAX_KEYWORD_BYTES, Keyword, NormalizationPolicy, UnicodeForm,
};
pub use token::{BlindToken, TOKEN_LENGTH};
