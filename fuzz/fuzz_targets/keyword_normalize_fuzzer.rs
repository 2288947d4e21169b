//! Fuzz target for keyword normalization and token derivation
//!
//! Feeds arbitrary strings and keys through `TokenDeriver`.
//!
//! # Invariants
//!
//! - Derivation NEVER panics on any input
//! - Accepted keywords are non-empty and within the byte limit
//! - Derivation is deterministic
//! - Deriving from the normalized keyword gives the same token

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sovereign_crypto::{NormalizationPolicy, SecretKey, TokenDeriver};

#[derive(Debug, Arbitrary)]
struct Input {
    keyword: String,
    key: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let deriver = TokenDeriver::default();
    let key = SecretKey::from_slice(&input.key);

    let Ok(token) = deriver.derive(&input.keyword, &key) else {
        return;
    };
    assert_eq!(deriver.derive(&input.keyword, &key).unwrap(), token);

    let policy = NormalizationPolicy::default();
    let keyword = policy.normalize(&input.keyword).unwrap();
    assert!(!keyword.as_str().is_empty());
    assert!(keyword.as_bytes().len() <= policy.max_keyword_bytes);

    assert_eq!(deriver.derive_normalized(&keyword, &key).unwrap(), token);
});
