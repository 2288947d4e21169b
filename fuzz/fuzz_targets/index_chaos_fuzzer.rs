//! Fuzz target for the vault under storage failures
//!
//! Drives `VaultEngine` with arbitrary add/remove/search sequences over
//! `ChaoticStorage`, checking the all-or-nothing contract against a model.
//!
//! # Invariants
//!
//! - The engine NEVER panics on storage errors
//! - Storage errors propagate as `Result::Err` and are retryable
//! - A failed call changes neither memory nor storage
//! - Search results always equal the model built from successful calls

#![no_main]

use std::collections::{BTreeMap, BTreeSet};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sovereign_vault::{
    ChaoticStorage, MemoryStorage, SecretKey, SystemEnv, VaultConfig, VaultEngine,
};

const KEYWORDS: [&str; 8] =
    ["alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta"];

#[derive(Debug, Clone, Arbitrary)]
struct ChaosScenario {
    /// Secret key bytes
    key: [u8; 32],
    /// Seed for ChaoticStorage RNG (deterministic failures)
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    /// Sequence of operations to perform
    operations: Vec<ChaosOperation>,
}

#[derive(Debug, Clone, Arbitrary)]
enum ChaosOperation {
    /// Index a document under the keywords picked by `mask`
    Add { doc_id: u8, mask: u8 },
    /// Remove a document from the keywords picked by `mask`
    Remove { doc_id: u8, mask: u8 },
    /// Search one keyword
    Search { keyword_idx: u8 },
}

fn pick(mask: u8) -> Vec<&'static str> {
    KEYWORDS.iter().enumerate().filter(|(i, _)| mask & (1 << i) != 0).map(|(_, k)| *k).collect()
}

fuzz_target!(|scenario: ChaosScenario| {
    let failure_rate = (scenario.failure_rate_tenth % 10) as f64 / 10.0;
    let storage = ChaoticStorage::with_seed(MemoryStorage::new(), failure_rate, scenario.chaos_seed);
    let key = SecretKey::from_slice(&scenario.key);

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

    runtime.block_on(async {
        let Ok(vault) = VaultEngine::open(storage.clone(), &VaultConfig::default(), SystemEnv::new())
        else {
            return;
        };

        let mut model: BTreeMap<&'static str, BTreeSet<u64>> = BTreeMap::new();

        for op in scenario.operations.iter().take(64) {
            match op {
                ChaosOperation::Add { doc_id, mask } | ChaosOperation::Remove { doc_id, mask } => {
                    let words = pick(*mask);
                    let doc = u64::from(*doc_id);
                    let adding = matches!(op, ChaosOperation::Add { .. });

                    let result = if adding {
                        vault.add_document(doc, words.as_slice(), &key).await
                    } else {
                        vault.remove_document(doc, words.as_slice(), &key).await
                    };

                    match result {
                        Ok(()) => {
                            for word in words {
                                let docs = model.entry(word).or_default();
                                if adding {
                                    docs.insert(doc);
                                } else {
                                    docs.remove(&doc);
                                }
                            }
                        },
                        Err(err) if words.is_empty() => {
                            assert_eq!(err, sovereign_vault::VaultError::EmptyKeywordSet);
                        },
                        Err(err) => assert!(err.is_retryable(), "unexpected error: {err}"),
                    }
                },
                ChaosOperation::Search { keyword_idx } => {
                    let word = KEYWORDS[*keyword_idx as usize % KEYWORDS.len()];
                    let result = vault.search(word, &key).await.unwrap();
                    let expected = model.get(word).cloned().unwrap_or_default();
                    assert_eq!(result.doc_ids, expected, "search diverged from model");
                },
            }
        }

        // Durable state matches memory
        for word in KEYWORDS {
            let token = vault.deriver().derive(word, &key).unwrap();
            let durable = storage.inner().get(&token).unwrap().unwrap_or_default();
            let expected = model.get(word).cloned().unwrap_or_default();
            assert_eq!(durable, expected, "storage diverged from model");
        }
    });
});
