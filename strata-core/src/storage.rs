// strata-core/src/storage.rs
// The seam between the query layer and whatever engine holds the records.
//
// The query layer needs exactly one thing from an engine: ordered scans with
// one advance per record. Everything else here (create/drop/put/get) is the
// bookkeeping a collection handle needs to maintain documents and their
// index entries. A durable engine plugs in by implementing `Storage`;
// `MemoryStore` is the in-crate reference implementation.

pub mod memory;

pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::Document;
use crate::error::Result;
use crate::index::{IndexDescriptor, Key};

/// Default primary-key field for collections that don't configure one.
pub const DEFAULT_ID_KEY: &str = "id";

/// A forward scan with a single suspension point.
///
/// `advance` yields the next record in the source's order, `Ok(None)` at the
/// end of the scan, or an error when the engine cannot produce the record —
/// and a scan error aborts the whole query upstream, never a partial result.
pub trait Cursor {
    fn advance(&mut self) -> Result<Option<Document>>;
}

/// Which ordered sequence a scan walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanSource {
    /// Ascending primary-key order.
    Primary,
    /// Ascending order of the named index's key, ties broken by primary key.
    /// Documents lacking the indexed field are not part of this sequence.
    Index(String),
}

impl fmt::Display for ScanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanSource::Primary => write!(f, "primary order"),
            ScanSource::Index(name) => write!(f, "index '{}'", name),
        }
    }
}

/// Per-collection configuration fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Field holding the primary key.
    pub id_key: String,
    /// Declared indexes; declaration order matters to index selection.
    pub indexes: Vec<IndexDescriptor>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfig {
            id_key: DEFAULT_ID_KEY.to_string(),
            indexes: Vec::new(),
        }
    }
}

impl CollectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = id_key.into();
        self
    }

    pub fn with_index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }
}

/// Engine interface the query layer is written against.
///
/// Writes are keyed by the document's id-key field and must keep every
/// declared index in step with the primary records. Scans must be ordered as
/// `ScanSource` describes.
pub trait Storage {
    /// Create a collection with the given configuration. Creating a name
    /// twice is an error.
    fn create_collection(&mut self, name: &str, config: CollectionConfig) -> Result<()>;

    /// Drop a collection and everything in it.
    fn drop_collection(&mut self, name: &str) -> Result<()>;

    fn has_collection(&self, name: &str) -> bool;

    fn list_collections(&self) -> Vec<String>;

    /// The collection's creation-time configuration.
    fn config(&self, collection: &str) -> Result<CollectionConfig>;

    /// Declared indexes, in declaration order.
    fn indexes(&self, collection: &str) -> Result<Vec<IndexDescriptor>> {
        Ok(self.config(collection)?.indexes)
    }

    /// Insert or replace the document stored under its id-key value.
    /// Returns the primary key written. Fails when the id key is missing
    /// from the document or a unique index would be violated.
    fn put(&mut self, collection: &str, document: Document) -> Result<Key>;

    fn get(&self, collection: &str, key: &Key) -> Result<Option<Document>>;

    /// Remove by primary key; `false` when no such record existed.
    fn delete(&mut self, collection: &str, key: &Key) -> Result<bool>;

    /// Remove every record, keeping the collection and its configuration.
    /// Returns how many records were removed.
    fn clear(&mut self, collection: &str) -> Result<usize>;

    fn count(&self, collection: &str) -> Result<usize>;

    /// Open an ordered scan over the collection.
    fn scan<'a>(&'a self, collection: &str, source: &ScanSource) -> Result<Box<dyn Cursor + 'a>>;
}
