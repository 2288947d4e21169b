//! Concurrency tests for the vault engine.
//!
//! Run on a multi-threaded runtime so that ingestion and search calls really
//! interleave across shards and threads.

use std::collections::BTreeSet;

use sovereign_vault::{
    DocSet, IndexConfig, MemoryStorage, SecretKey, Storage, SystemEnv, TokenDeriver, VaultConfig,
    VaultEngine,
};

fn key() -> SecretKey {
    SecretKey::from_slice(&[42u8; 32])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_to_one_keyword_keep_every_document() {
    let storage = MemoryStorage::new();
    let vault =
        VaultEngine::open(storage.clone(), &VaultConfig::default(), SystemEnv::new()).unwrap();

    let mut tasks = Vec::new();
    for doc_id in 0..64u64 {
        let vault = vault.clone();
        tasks.push(tokio::spawn(async move {
            vault.add_document(doc_id, &["contended", "shared_topic"], &key()).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let expected: DocSet = (0..64).collect();
    assert_eq!(vault.search("contended", &key()).await.unwrap().doc_ids, expected);
    assert_eq!(vault.search("shared_topic", &key()).await.unwrap().doc_ids, expected);

    // The durable copy is the union too
    let token = TokenDeriver::default().derive("contended", &key()).unwrap();
    assert_eq!(storage.get(&token).unwrap(), Some(expected));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_batches_do_not_deadlock() {
    let config = VaultConfig {
        index: IndexConfig { shard_count: 3, ..IndexConfig::default() },
        ..VaultConfig::default()
    };
    let vault = VaultEngine::open(MemoryStorage::new(), &config, SystemEnv::new()).unwrap();
    let words: Vec<String> = (0..12).map(|i| format!("topic_{i}")).collect();

    let mut tasks = Vec::new();
    for doc_id in 0..32u64 {
        let vault = vault.clone();
        // Each document takes the keywords in a different rotation
        let mut keywords = words.clone();
        keywords.rotate_left(doc_id as usize % words.len());
        tasks.push(tokio::spawn(async move {
            vault.add_document(doc_id, keywords.as_slice(), &key()).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for word in &words {
        let result = vault.search(word, &key()).await.unwrap();
        assert_eq!(result.doc_ids.len(), 32);
    }
    assert_eq!(vault.index().len().await, words.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn searches_run_alongside_ingestion() {
    let vault =
        VaultEngine::open(MemoryStorage::new(), &VaultConfig::default(), SystemEnv::new()).unwrap();
    vault.add_document(0, &["steady"], &key()).await.unwrap();

    let writer = {
        let vault = vault.clone();
        tokio::spawn(async move {
            for doc_id in 1..100u64 {
                vault.add_document(doc_id, &["steady", "growing"], &key()).await.unwrap();
            }
        })
    };

    let reader = {
        let vault = vault.clone();
        tokio::spawn(async move {
            let mut seen = BTreeSet::new();
            for _ in 0..200 {
                let result = vault.search("steady", &key()).await.unwrap();
                // Document 0 is never removed and sets only grow
                assert!(result.doc_ids.contains(&0));
                assert!(result.doc_ids.len() >= seen.len());
                seen = result.doc_ids;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();

    assert_eq!(vault.search("steady", &key()).await.unwrap().doc_ids.len(), 100);
}
