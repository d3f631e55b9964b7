//! # Property Storage
//!
//! Persistence hooks for external property kinds.
//!
//! A store maps sid -> attribute map for a single owner. The container
//! itself never talks to a store; only `ExternalKind` does, during
//! promotion (`get`) and save (`put` / `remove`).
//!
//! ## Backends
//!
//! - `MemoryStore`: process-local, for tests and dry runs
//! - `RedbStore`: disk-backed via the redb embedded database

mod redb_store;

pub use redb_store::RedbStore;

use crate::types::{AttributeMap, PropertyError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

/// Storage for properties that live outside the owner's definition.
pub trait PropertyStore: fmt::Debug + Send + Sync {
    /// Load the stored attributes of `sid`.
    fn get(&self, sid: &str) -> Result<Option<AttributeMap>, PropertyError>;

    /// Store (replace) the attributes of `sid`.
    fn put(&self, sid: &str, attributes: &AttributeMap) -> Result<(), PropertyError>;

    /// Remove `sid`. Returns whether a record existed.
    fn remove(&self, sid: &str) -> Result<bool, PropertyError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, AttributeMap>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sids currently stored, sorted.
    pub fn sids(&self) -> Result<Vec<String>, PropertyError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, AttributeMap>>, PropertyError> {
        self.records
            .lock()
            .map_err(|_| PropertyError::Storage("memory store lock poisoned".to_string()))
    }
}

impl PropertyStore for MemoryStore {
    fn get(&self, sid: &str) -> Result<Option<AttributeMap>, PropertyError> {
        Ok(self.lock()?.get(sid).cloned())
    }

    fn put(&self, sid: &str, attributes: &AttributeMap) -> Result<(), PropertyError> {
        self.lock()?.insert(sid.to_string(), attributes.clone());
        Ok(())
    }

    fn remove(&self, sid: &str) -> Result<bool, PropertyError> {
        Ok(self.lock()?.remove(sid).is_some())
    }
}
