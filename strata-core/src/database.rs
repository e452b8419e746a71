// strata-core/src/database.rs

use std::sync::Arc;

use parking_lot::RwLock;

use crate::collection::Collection;
use crate::error::Result;
use crate::log_info;
use crate::storage::{CollectionConfig, MemoryStore, Storage};

/// Database handle, generic over the storage backend.
///
/// - `Database<MemoryStore>` - ordered in-memory storage (default)
/// - `Database<S>` - any other `Storage` implementation via `with_storage`
///
/// # Examples
/// ```
/// use strata_core::{Database, FindOptions};
/// use serde_json::json;
///
/// let db = Database::new();
/// let books = db.create_collection("books", Default::default())?;
/// books.insert(json!({"title": "Quarry Memories", "author": "Fred"}))?;
///
/// let options = FindOptions::from_json(&json!({"where": {"author": "Fred"}}))?;
/// assert_eq!(books.find(&options)?.len(), 1);
/// # Ok::<(), strata_core::StrataError>(())
/// ```
pub struct Database<S: Storage = MemoryStore> {
    storage: Arc<RwLock<S>>,
}

impl Database<MemoryStore> {
    /// Fresh database over the in-memory store.
    pub fn new() -> Self {
        Database::with_storage(MemoryStore::new())
    }
}

impl Default for Database<MemoryStore> {
    fn default() -> Self {
        Database::new()
    }
}

impl<S: Storage> Clone for Database<S> {
    fn clone(&self) -> Self {
        Database {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> Database<S> {
    /// Wraps an existing storage backend.
    pub fn with_storage(storage: S) -> Self {
        Database {
            storage: Arc::new(RwLock::new(storage)),
        }
    }

    /// Creates a collection and returns a handle to it. Fails with
    /// `CollectionExists` when the name is taken.
    pub fn create_collection(&self, name: &str, config: CollectionConfig) -> Result<Collection<S>> {
        let id_key = config.id_key.clone();
        self.storage.write().create_collection(name, config)?;
        log_info!("created collection '{}' (id key '{}')", name, id_key);
        Ok(Collection::new(
            name.to_string(),
            Arc::clone(&self.storage),
            id_key,
        ))
    }

    /// Handle to an existing collection, or `CollectionNotFound`.
    pub fn collection(&self, name: &str) -> Result<Collection<S>> {
        let id_key = self.storage.read().config(name)?.id_key;
        Ok(Collection::new(
            name.to_string(),
            Arc::clone(&self.storage),
            id_key,
        ))
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.storage.read().has_collection(name)
    }

    pub fn list_collections(&self) -> Vec<String> {
        self.storage.read().list_collections()
    }

    /// Drops a collection and everything in it.
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        self.storage.write().drop_collection(name)?;
        log_info!("dropped collection '{}'", name);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
