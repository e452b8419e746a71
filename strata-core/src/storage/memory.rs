// strata-core/src/storage/memory.rs
// In-memory reference engine. Ordered by construction: primary records live
// in a BTreeMap keyed by the id-key value, each declared index in its own
// BTreeMap from indexed value to a posting list of primary keys.

use std::collections::{btree_map, BTreeMap, HashMap};

use crate::document::Document;
use crate::error::{Result, StrataError};
use crate::index::{IndexDescriptor, Key};
use crate::storage::{CollectionConfig, Cursor, ScanSource, Storage};

/// Reference `Storage` implementation backed by ordered in-memory maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: HashMap<String, StoredCollection>,
}

#[derive(Debug)]
struct StoredCollection {
    config: CollectionConfig,
    primary: BTreeMap<Key, Document>,
    // parallel to config.indexes, declaration order preserved
    indexes: Vec<IndexState>,
}

#[derive(Debug)]
struct IndexState {
    descriptor: IndexDescriptor,
    // indexed value -> primary keys holding it, sorted ascending
    entries: BTreeMap<Key, Vec<Key>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn collection(&self, name: &str) -> Result<&StoredCollection> {
        self.collections
            .get(name)
            .ok_or_else(|| StrataError::CollectionNotFound(name.to_string()))
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut StoredCollection> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| StrataError::CollectionNotFound(name.to_string()))
    }
}

impl Storage for MemoryStore {
    fn create_collection(&mut self, name: &str, config: CollectionConfig) -> Result<()> {
        if self.collections.contains_key(name) {
            return Err(StrataError::CollectionExists(name.to_string()));
        }
        let indexes = config
            .indexes
            .iter()
            .map(|descriptor| IndexState {
                descriptor: descriptor.clone(),
                entries: BTreeMap::new(),
            })
            .collect();
        self.collections.insert(
            name.to_string(),
            StoredCollection {
                config,
                primary: BTreeMap::new(),
                indexes,
            },
        );
        Ok(())
    }

    fn drop_collection(&mut self, name: &str) -> Result<()> {
        self.collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StrataError::CollectionNotFound(name.to_string()))
    }

    fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.keys().cloned().collect();
        names.sort();
        names
    }

    fn config(&self, collection: &str) -> Result<CollectionConfig> {
        Ok(self.collection(collection)?.config.clone())
    }

    fn put(&mut self, collection: &str, document: Document) -> Result<Key> {
        let col = self.collection_mut(collection)?;
        let key = match document.get(&col.config.id_key) {
            Some(value) => Key::from_value(value),
            None => {
                return Err(StrataError::InvalidInput(format!(
                    "document is missing the id key '{}'",
                    col.config.id_key
                )))
            }
        };

        // Unique checks happen before any mutation so a rejected put leaves
        // the collection exactly as it was.
        for index in &col.indexes {
            if !index.descriptor.unique {
                continue;
            }
            if let Some(value) = document.get(&index.descriptor.key_path) {
                let index_key = Key::from_value(value);
                if let Some(holders) = index.entries.get(&index_key) {
                    if holders.iter().any(|holder| *holder != key) {
                        return Err(StrataError::IndexError(format!(
                            "unique index '{}' already contains key {}",
                            index.descriptor.name, index_key
                        )));
                    }
                }
            }
        }

        if let Some(previous) = col.primary.remove(&key) {
            detach_entries(&mut col.indexes, &previous, &key);
        }
        attach_entries(&mut col.indexes, &document, &key);
        col.primary.insert(key.clone(), document);
        Ok(key)
    }

    fn get(&self, collection: &str, key: &Key) -> Result<Option<Document>> {
        Ok(self.collection(collection)?.primary.get(key).cloned())
    }

    fn delete(&mut self, collection: &str, key: &Key) -> Result<bool> {
        let col = self.collection_mut(collection)?;
        match col.primary.remove(key) {
            Some(document) => {
                detach_entries(&mut col.indexes, &document, key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&mut self, collection: &str) -> Result<usize> {
        let col = self.collection_mut(collection)?;
        let removed = col.primary.len();
        col.primary.clear();
        for index in &mut col.indexes {
            index.entries.clear();
        }
        Ok(removed)
    }

    fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.collection(collection)?.primary.len())
    }

    fn scan<'a>(&'a self, collection: &str, source: &ScanSource) -> Result<Box<dyn Cursor + 'a>> {
        let col = self.collection(collection)?;
        match source {
            ScanSource::Primary => Ok(Box::new(PrimaryCursor {
                records: col.primary.values(),
            })),
            ScanSource::Index(name) => {
                let index = col
                    .indexes
                    .iter()
                    .find(|index| index.descriptor.name == *name)
                    .ok_or_else(|| {
                        StrataError::IndexError(format!(
                            "no index '{}' on collection '{}'",
                            name, collection
                        ))
                    })?;
                Ok(Box::new(IndexCursor {
                    primary: &col.primary,
                    groups: index.entries.iter(),
                    pending: EMPTY_KEYS.iter(),
                }))
            }
        }
    }
}

fn attach_entries(indexes: &mut [IndexState], document: &Document, key: &Key) {
    for index in indexes {
        if let Some(value) = document.get(&index.descriptor.key_path) {
            let index_key = Key::from_value(value);
            let holders = index.entries.entry(index_key).or_default();
            if let Err(pos) = holders.binary_search(key) {
                holders.insert(pos, key.clone());
            }
        }
    }
}

fn detach_entries(indexes: &mut [IndexState], document: &Document, key: &Key) {
    for index in indexes {
        if let Some(value) = document.get(&index.descriptor.key_path) {
            let index_key = Key::from_value(value);
            if let Some(holders) = index.entries.get_mut(&index_key) {
                holders.retain(|holder| holder != key);
                if holders.is_empty() {
                    index.entries.remove(&index_key);
                }
            }
        }
    }
}

struct PrimaryCursor<'a> {
    records: btree_map::Values<'a, Key, Document>,
}

impl Cursor for PrimaryCursor<'_> {
    fn advance(&mut self) -> Result<Option<Document>> {
        Ok(self.records.next().cloned())
    }
}

const EMPTY_KEYS: &[Key] = &[];

struct IndexCursor<'a> {
    primary: &'a BTreeMap<Key, Document>,
    groups: btree_map::Iter<'a, Key, Vec<Key>>,
    pending: std::slice::Iter<'a, Key>,
}

impl Cursor for IndexCursor<'_> {
    fn advance(&mut self) -> Result<Option<Document>> {
        loop {
            if let Some(key) = self.pending.next() {
                return match self.primary.get(key) {
                    Some(document) => Ok(Some(document.clone())),
                    // A posting list pointing at a missing record means the
                    // index and primary storage disagree.
                    None => Err(StrataError::Corruption(format!(
                        "index entry points at missing record (key {})",
                        key
                    ))),
                };
            }
            match self.groups.next() {
                Some((_, holders)) => self.pending = holders.iter(),
                None => return Ok(None),
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
