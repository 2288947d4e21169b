//! Caller-held secret key material

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Default secret key length in bytes (256 bits).
pub const SECRET_KEY_LENGTH: usize = 32;

/// Secret key that blind tokens are derived from.
///
/// The vault never stores this key. It is supplied on every call and
/// validated against the configured length during derivation, so a key of any
/// length can be constructed here.
///
/// # Security
///
/// - Bytes are zeroized on drop
/// - `Debug` never prints key bytes
/// - Equality is constant time
#[derive(Clone)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Take ownership of raw key bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Copy key bytes from a slice.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self { bytes: bytes.to_vec() }
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the key has no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw key bytes.
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<redacted {} bytes>)", self.bytes.len())
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}
