//! Crash recovery tests for `RedbStorage`-backed vaults.
//!
//! These tests verify that indexed documents persist across database
//! close/reopen cycles, simulating process restarts.

use sovereign_vault::{
    DocSet, EncryptedIndex, IndexConfig, RedbStorage, SecretKey, SystemEnv, VaultConfig,
    VaultEngine,
};
use tempfile::tempdir;

fn key() -> SecretKey {
    SecretKey::from_slice(&[3u8; 32])
}

fn docs(ids: &[u64]) -> DocSet {
    ids.iter().copied().collect()
}

#[tokio::test]
async fn test_documents_survive_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("vault.redb");

    // Ingest, then simulate clean shutdown
    {
        let storage = RedbStorage::open(&db_path).unwrap();
        let vault = VaultEngine::open(storage, &VaultConfig::default(), SystemEnv::new()).unwrap();

        vault
            .add_document(1001, &["petroleum_reserves", "cyber_defense", "vision_2030"], &key())
            .await
            .unwrap();
        vault
            .add_document(1002, &["smart_grid", "neom_infrastructure", "data_sovereignty"], &key())
            .await
            .unwrap();

        // Database dropped
    }

    // Reopen and verify every document is found
    {
        let storage = RedbStorage::open(&db_path).unwrap();
        let vault = VaultEngine::open(storage, &VaultConfig::default(), SystemEnv::new()).unwrap();

        assert_eq!(vault.index().len().await, 6);
        for (keyword, doc) in [
            ("petroleum_reserves", 1001),
            ("cyber_defense", 1001),
            ("vision_2030", 1001),
            ("smart_grid", 1002),
            ("neom_infrastructure", 1002),
            ("data_sovereignty", 1002),
        ] {
            let result = vault.search(keyword, &key()).await.unwrap();
            assert_eq!(result.doc_ids, docs(&[doc]), "lost {doc} after restart");
        }
    }
}

#[tokio::test]
async fn test_removal_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("vault.redb");

    {
        let storage = RedbStorage::open(&db_path).unwrap();
        let vault = VaultEngine::open(storage, &VaultConfig::default(), SystemEnv::new()).unwrap();

        vault.add_document(1, &["alpha", "beta"], &key()).await.unwrap();
        vault.add_document(2, &["alpha"], &key()).await.unwrap();
        vault.remove_document(1, &["alpha", "beta"], &key()).await.unwrap();
    }

    let storage = RedbStorage::open(&db_path).unwrap();
    let vault = VaultEngine::open(storage, &VaultConfig::default(), SystemEnv::new()).unwrap();

    assert_eq!(vault.search("alpha", &key()).await.unwrap().doc_ids, docs(&[2]));
    assert!(!vault.search("beta", &key()).await.unwrap().found);
    assert_eq!(vault.index().len().await, 1);
}

#[tokio::test]
async fn test_multiple_restart_cycles() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("vault.redb");

    for cycle in 0..5u64 {
        let storage = RedbStorage::open(&db_path).unwrap();
        let vault = VaultEngine::open(storage, &VaultConfig::default(), SystemEnv::new()).unwrap();

        // Everything from earlier cycles is still there
        let expected: DocSet = (0..cycle).collect();
        assert_eq!(vault.search("ledger", &key()).await.unwrap().doc_ids, expected);

        vault.add_document(cycle, &["ledger"], &key()).await.unwrap();
    }
}

#[tokio::test]
async fn test_shard_count_change_across_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("vault.redb");

    {
        let storage = RedbStorage::open(&db_path).unwrap();
        let config = IndexConfig { shard_count: 2, ..IndexConfig::default() };
        let index = EncryptedIndex::open(storage, &config).unwrap();
        let deriver = VaultConfig::default().token_deriver();

        let tokens = deriver.derive_all(&["one", "two", "three"], &key()).unwrap();
        assert_eq!(index.insert_batch(&tokens, 77).await.unwrap(), 3);
    }

    // Sharding is a memory layout only; a different count loads the same data
    let storage = RedbStorage::open(&db_path).unwrap();
    let config = VaultConfig {
        index: IndexConfig { shard_count: 9, ..IndexConfig::default() },
        ..VaultConfig::default()
    };
    let vault = VaultEngine::open(storage, &config, SystemEnv::new()).unwrap();

    for keyword in ["one", "two", "three"] {
        assert_eq!(vault.search(keyword, &key()).await.unwrap().doc_ids, docs(&[77]));
    }
}
