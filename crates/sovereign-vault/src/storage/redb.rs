//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety.
//! All entries survive process restarts.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};
use sovereign_crypto::BlindToken;

use super::{DocSet, Storage, StorageError};

/// Table: index_entries
/// Key: blind token bytes [32 bytes]
/// Value: CBOR-encoded sequence of document ids
const ENTRIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("index_entries");

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the entries table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(ENTRIES).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Write entries inside one transaction; commits only if all succeed.
    fn write_entries<'a>(
        &self,
        entries: impl IntoIterator<Item = (&'a BlindToken, &'a DocSet)>,
    ) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(ENTRIES).map_err(|e| StorageError::Io(e.to_string()))?;

            for (token, docs) in entries {
                let key = token.as_bytes().as_slice();

                if docs.is_empty() {
                    table.remove(key).map_err(|e| StorageError::Io(e.to_string()))?;
                    continue;
                }

                let value = encode_docs(docs)?;
                table.insert(key, value.as_slice()).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }
}

impl Storage for RedbStorage {
    fn put(&self, token: &BlindToken, docs: &DocSet) -> Result<(), StorageError> {
        self.write_entries([(token, docs)])
    }

    fn put_many(&self, entries: &[(BlindToken, DocSet)]) -> Result<(), StorageError> {
        self.write_entries(entries.iter().map(|(token, docs)| (token, docs)))
    }

    fn get(&self, token: &BlindToken) -> Result<Option<DocSet>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;

        let table = txn.open_table(ENTRIES).map_err(|e| StorageError::Io(e.to_string()))?;

        match table
            .get(token.as_bytes().as_slice())
            .map_err(|e| StorageError::Io(e.to_string()))?
        {
            Some(value) => Ok(Some(decode_docs(value.value())?)),
            None => Ok(None),
        }
    }

    fn list_entries(&self) -> Result<Vec<(BlindToken, DocSet)>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;

        let table = txn.open_table(ENTRIES).map_err(|e| StorageError::Io(e.to_string()))?;

        let mut entries = Vec::new();

        for result in table.iter().map_err(|e| StorageError::Io(e.to_string()))? {
            let (key, value) = result.map_err(|e| StorageError::Io(e.to_string()))?;
            let token = BlindToken::from_slice(key.value()).ok_or_else(|| {
                StorageError::Serialization(format!(
                    "entry key is {} bytes, expected a blind token",
                    key.value().len()
                ))
            })?;
            entries.push((token, decode_docs(value.value())?));
        }

        Ok(entries)
    }
}

/// Encode a document set as a CBOR sequence.
fn encode_docs(docs: &DocSet) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::with_capacity(docs.len() * 9 + 2);
    ciborium::into_writer(docs, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

/// Decode a CBOR sequence back into a document set.
fn decode_docs(bytes: &[u8]) -> Result<DocSet, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}
