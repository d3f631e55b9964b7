//! # redb-backed Property Store
//!
//! A disk-backed [`PropertyStore`] using the redb embedded database.
//!
//! Each record is one sid. The attribute map is encoded with postcard as a
//! list of `(name, json_text)` pairs: JSON values are self-describing, so
//! they are kept as text inside the compact postcard frame.

use super::PropertyStore;
use crate::types::{AttributeMap, PropertyError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for properties: sid -> postcard-encoded attribute pairs
const PROPERTIES: TableDefinition<&str, &[u8]> = TableDefinition::new("properties");

/// A property store persisted to a redb file.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

fn storage_err(e: impl std::fmt::Display) -> PropertyError {
    PropertyError::Storage(e.to_string())
}

fn encode(attributes: &AttributeMap) -> Result<Vec<u8>, PropertyError> {
    let pairs = attributes
        .iter()
        .map(|(name, value)| {
            serde_json::to_string(value)
                .map(|text| (name.clone(), text))
                .map_err(|e| PropertyError::Serialization(e.to_string()))
        })
        .collect::<Result<Vec<(String, String)>, _>>()?;
    postcard::to_allocvec(&pairs).map_err(|e| PropertyError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<AttributeMap, PropertyError> {
    let pairs: Vec<(String, String)> =
        postcard::from_bytes(bytes).map_err(|e| PropertyError::Serialization(e.to_string()))?;
    pairs
        .into_iter()
        .map(|(name, text)| {
            serde_json::from_str(&text)
                .map(|value| (name, value))
                .map_err(|e| PropertyError::Serialization(e.to_string()))
        })
        .collect()
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PropertyError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Create the table up front so readers never see it missing
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(PROPERTIES).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        Ok(Self { db })
    }
}

impl PropertyStore for RedbStore {
    fn get(&self, sid: &str) -> Result<Option<AttributeMap>, PropertyError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(PROPERTIES).map_err(storage_err)?;
        let record = table.get(sid).map_err(storage_err)?;
        record.map(|guard| decode(guard.value())).transpose()
    }

    fn put(&self, sid: &str, attributes: &AttributeMap) -> Result<(), PropertyError> {
        let bytes = encode(attributes)?;
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(PROPERTIES).map_err(storage_err)?;
            table.insert(sid, bytes.as_slice()).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)
    }

    fn remove(&self, sid: &str) -> Result<bool, PropertyError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let existed = {
            let mut table = write_txn.open_table(PROPERTIES).map_err(storage_err)?;
            table.remove(sid).map_err(storage_err)?.is_some()
        };
        write_txn.commit().map_err(storage_err)?;
        Ok(existed)
    }
}
