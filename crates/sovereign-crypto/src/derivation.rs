//! Blind token derivation using HKDF + HMAC-SHA256

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{
    error::CryptoError,
    key::{SECRET_KEY_LENGTH, SecretKey},
    normalize::{Keyword, NormalizationPolicy},
    token::{BlindToken, TOKEN_LENGTH},
};

type HmacSha256 = Hmac<Sha256>;

/// Label used for index key derivation
pub const INDEX_KEY_LABEL: &[u8] = b"sovereignIndexV1";

/// Expand the caller's secret into the key used for token PRF evaluations.
///
/// Domain-separates token derivation from any other use of the same secret.
fn derive_index_key(secret: &[u8]) -> Zeroizing<[u8; 32]> {
    let hkdf = Hkdf::<Sha256>::new(None, secret);

    let mut index_key = Zeroizing::new([0u8; 32]);
    let Ok(()) = hkdf.expand(INDEX_KEY_LABEL, &mut index_key[..]) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    index_key
}

/// Evaluate the token PRF for one keyword under an expanded index key.
fn prf(index_key: &[u8; 32], keyword: &Keyword) -> BlindToken {
    let Ok(mut mac) = HmacSha256::new_from_slice(index_key) else {
        unreachable!("HMAC accepts keys of any length");
    };
    mac.update(keyword.as_bytes());
    let result = mac.finalize().into_bytes();

    let mut token = [0u8; TOKEN_LENGTH];
    token.copy_from_slice(&result);
    BlindToken::from_bytes(token)
}

/// Derive the blind token for a normalized keyword.
///
/// Pure function of (keyword, key material). Does not check key length, so
/// it stays private; callers go through [`TokenDeriver`], which enforces the
/// configured length.
///
/// # Security
///
/// - Same inputs always produce the same token (index lookups work)
/// - Different keywords produce independent tokens (HMAC is a PRF)
/// - Different keys produce unrelated tokens (key isolation)
fn derive_blind_token(keyword: &Keyword, key_material: &[u8]) -> BlindToken {
    let index_key = derive_index_key(key_material);
    prf(&index_key, keyword)
}

/// Maps (keyword, secret key) to blind tokens.
///
/// Holds only configuration: the required key length and the normalization
/// policy. No state survives between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDeriver {
    key_length: usize,
    policy: NormalizationPolicy,
}

impl Default for TokenDeriver {
    fn default() -> Self {
        Self::new(SECRET_KEY_LENGTH, NormalizationPolicy::default())
    }
}

impl TokenDeriver {
    /// Create a deriver for keys of `key_length` bytes.
    pub fn new(key_length: usize, policy: NormalizationPolicy) -> Self {
        Self { key_length, policy }
    }

    /// Required key length in bytes.
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Normalization policy applied to raw keywords.
    pub fn policy(&self) -> &NormalizationPolicy {
        &self.policy
    }

    /// Check that `key` has the configured length.
    pub fn check_key(&self, key: &SecretKey) -> Result<(), CryptoError> {
        if key.len() == self.key_length {
            Ok(())
        } else {
            Err(CryptoError::InvalidKeyLength { expected: self.key_length, actual: key.len() })
        }
    }

    /// Normalize `keyword` and derive its token.
    pub fn derive(&self, keyword: &str, key: &SecretKey) -> Result<BlindToken, CryptoError> {
        self.check_key(key)?;
        let keyword = self
            .policy
            .normalize(keyword)
            .map_err(|reason| CryptoError::InvalidKeyword { position: 0, reason })?;

        Ok(derive_blind_token(&keyword, key.expose()))
    }

    /// Derive the token for an already-normalized keyword.
    pub fn derive_normalized(
        &self,
        keyword: &Keyword,
        key: &SecretKey,
    ) -> Result<BlindToken, CryptoError> {
        self.check_key(key)?;
        Ok(derive_blind_token(keyword, key.expose()))
    }

    /// Derive tokens for a batch of keywords under one key.
    ///
    /// Every keyword is normalized before any token is produced. Fails on the
    /// first invalid keyword, reporting its position, and returns no tokens.
    /// Output order matches input order; duplicates are kept.
    pub fn derive_all<K: AsRef<str>>(
        &self,
        keywords: &[K],
        key: &SecretKey,
    ) -> Result<Vec<BlindToken>, CryptoError> {
        self.check_key(key)?;

        let normalized = keywords
            .iter()
            .enumerate()
            .map(|(position, raw)| {
                self.policy
                    .normalize(raw.as_ref())
                    .map_err(|reason| CryptoError::InvalidKeyword { position, reason })
            })
            .collect::<Result<Vec<Keyword>, CryptoError>>()?;

        let index_key = derive_index_key(key.expose());
        Ok(normalized.iter().map(|keyword| prf(&index_key, keyword)).collect())
    }
}
