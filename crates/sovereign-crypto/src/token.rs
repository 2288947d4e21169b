//! Blind tokens that stand in for keywords

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use subtle::ConstantTimeEq;

/// Blind token length in bytes (HMAC-SHA256 output).
pub const TOKEN_LENGTH: usize = 32;

/// Keyed-PRF output standing in for a keyword in the index.
///
/// Reveals nothing about the keyword without the secret key, so it is safe to
/// persist and to log. Equality runs in constant time so that comparing a
/// queried token against stored ones does not leak how many leading bytes matched.
#[derive(Clone, Copy)]
pub struct BlindToken([u8; TOKEN_LENGTH]);

impl BlindToken {
    /// Wrap raw token bytes.
    pub const fn from_bytes(bytes: [u8; TOKEN_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Decode a token from a slice of exactly [`TOKEN_LENGTH`] bytes.
    ///
    /// Returns `None` for any other length.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; TOKEN_LENGTH]>::try_from(bytes).ok().map(Self)
    }

    /// Raw token bytes.
    pub fn as_bytes(&self) -> &[u8; TOKEN_LENGTH] {
        &self.0
    }

    /// Short hex prefix for log lines.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl ConstantTimeEq for BlindToken {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for BlindToken {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for BlindToken {}

impl Hash for BlindToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for BlindToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlindToken({})", self.fingerprint())
    }
}

impl fmt::Display for BlindToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
