// strata-core/src/collection.rs
// Collection handle: CRUD plus the find pipeline (plan -> scan -> execute).

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::document::{json_type_name, Document};
use crate::error::{Result, StrataError};
use crate::find_options::FindOptions;
use crate::index::{IndexDescriptor, Key};
use crate::query::filter::Filter;
use crate::query::{executor, planner};
use crate::{log_debug, log_error, log_warn};
use crate::storage::Storage;

type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Handle to one named collection. Cheap to clone; clones share storage.
pub struct Collection<S: Storage> {
    name: String,
    storage: Arc<RwLock<S>>,
    id_key: String,
    id_generator: Option<IdGenerator>,
}

impl<S: Storage> Clone for Collection<S> {
    fn clone(&self) -> Self {
        Collection {
            name: self.name.clone(),
            storage: Arc::clone(&self.storage),
            id_key: self.id_key.clone(),
            id_generator: self.id_generator.clone(),
        }
    }
}

impl<S: Storage> Collection<S> {
    // ========== CONSTRUCTOR ==========

    pub(crate) fn new(name: String, storage: Arc<RwLock<S>>, id_key: String) -> Self {
        Collection {
            name,
            storage,
            id_key,
            id_generator: None,
        }
    }

    /// Replaces the default UUID v4 generator for documents inserted without
    /// a caller-controlled id.
    pub fn with_id_generator(
        mut self,
        generator: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.id_generator = Some(Arc::new(generator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    // ========== QUERY OPERATIONS ==========

    /// Runs a find: selects a scan source, drives a cursor over it, and
    /// returns matches in visit order.
    pub fn find(&self, options: &FindOptions) -> Result<Vec<Document>> {
        let storage = self.storage.read();
        let indexes = storage.indexes(&self.name)?;
        let source = planner::plan_scan(options.filter.as_ref(), &indexes);
        log_debug!("find on '{}' reading {}", self.name, source);

        let mut cursor = storage.scan(&self.name, &source)?;
        executor::execute(cursor.as_mut(), options)
    }

    /// First match, or `None`. An explicit `limit: Some(0)` still means zero
    /// results.
    pub fn find_one(&self, options: &FindOptions) -> Result<Option<Document>> {
        let mut capped = options.clone();
        capped.limit = Some(capped.limit.map_or(1, |limit| limit.min(1)));
        Ok(self.find(&capped)?.pop())
    }

    /// Number of stored documents.
    pub fn count(&self) -> Result<usize> {
        self.storage.read().count(&self.name)
    }

    /// Number of documents matching `filter`.
    pub fn count_matching(&self, filter: &Filter) -> Result<usize> {
        let options = FindOptions::new().with_filter(filter.clone());
        Ok(self.find(&options)?.len())
    }

    // ========== CRUD OPERATIONS ==========

    /// Inserts a document, stamping a fresh id onto the id key. Any value the
    /// caller put there is overwritten; use `upsert` to keep a chosen id.
    pub fn insert(&self, value: Value) -> Result<Document> {
        let mut document = require_object(value)?;
        document.set(&self.id_key, Value::String(self.generate_id()));

        let mut storage = self.storage.write();
        storage.put(&self.name, document.clone())?;
        log_debug!("inserted into '{}' ({} fields)", self.name, document.len());
        Ok(document)
    }

    /// Inserts a batch. Every element is validated before the first write, so
    /// a malformed element means nothing was inserted.
    pub fn insert_many(&self, values: Vec<Value>) -> Result<Vec<Document>> {
        for (position, value) in values.iter().enumerate() {
            if !value.is_object() {
                return Err(StrataError::InvalidInput(format!(
                    "cannot insert a non-object document at position {}, got {}",
                    position,
                    json_type_name(value)
                )));
            }
        }

        let mut inserted = Vec::with_capacity(values.len());
        for value in values {
            inserted.push(self.insert(value)?);
        }
        Ok(inserted)
    }

    /// Merges `changes` into every document matching `filter`, preserving
    /// fields the changes do not mention. Returns the number updated.
    pub fn update(&self, filter: &Filter, changes: &Value) -> Result<usize> {
        let changes = match changes.as_object() {
            Some(map) => map,
            None => {
                return Err(StrataError::InvalidInput(format!(
                    "update changes must be an object, got {}",
                    json_type_name(changes)
                )))
            }
        };
        if changes.contains_key(&self.id_key) {
            return Err(StrataError::InvalidInput(format!(
                "the id key '{}' cannot be changed by update",
                self.id_key
            )));
        }

        let matches = self.find(&FindOptions::new().with_filter(filter.clone()))?;
        let mut storage = self.storage.write();
        let mut updated = 0;
        for mut document in matches {
            document.merge(changes);
            storage.put(&self.name, document)?;
            updated += 1;
        }
        log_debug!("updated {} document(s) in '{}'", updated, self.name);
        Ok(updated)
    }

    /// Replaces the first document matching `filter` with `value`, keeping
    /// the existing primary key. With no match, inserts `value` as-is,
    /// generating an id only when the id key is absent.
    pub fn upsert(&self, filter: &Filter, value: &Value) -> Result<Document> {
        let mut document = require_object(value.clone())?;
        let existing = self
            .find_one(&FindOptions::new().with_filter(filter.clone()))?;

        match existing {
            Some(previous) => {
                match previous.get(&self.id_key) {
                    Some(id_value) => document.set(&self.id_key, id_value.clone()),
                    None => {
                        log_error!("upsert in '{}' hit a stored document without '{}'", self.name, self.id_key);
                        return Err(StrataError::Corruption(format!(
                            "stored document in '{}' lacks its id key '{}'",
                            self.name, self.id_key
                        )))
                    }
                }
            }
            None => {
                if document.get(&self.id_key).is_none() {
                    document.set(&self.id_key, Value::String(self.generate_id()));
                }
            }
        }

        let mut storage = self.storage.write();
        storage.put(&self.name, document.clone())?;
        Ok(document)
    }

    /// Removes every document matching `filter`. Returns the number removed.
    pub fn remove(&self, filter: &Filter) -> Result<usize> {
        let matches = self.find(&FindOptions::new().with_filter(filter.clone()))?;
        let mut storage = self.storage.write();
        let mut removed = 0;
        for document in matches {
            if let Some(id_value) = document.get(&self.id_key) {
                if storage.delete(&self.name, &Key::from_value(id_value))? {
                    removed += 1;
                }
            } else {
                log_warn!("skipping a matched document in '{}' without '{}'", self.name, self.id_key);
            }
        }
        log_debug!("removed {} document(s) from '{}'", removed, self.name);
        Ok(removed)
    }

    /// Removes the document whose id key holds `id` and returns it.
    pub fn remove_by_id(&self, id: &Value) -> Result<Document> {
        let key = Key::from_value(id);
        let mut storage = self.storage.write();
        match storage.get(&self.name, &key)? {
            Some(document) => {
                storage.delete(&self.name, &key)?;
                Ok(document)
            }
            None => Err(StrataError::DocumentNotFound(format!(
                "no document in '{}' with {} = {}",
                self.name, self.id_key, id
            ))),
        }
    }

    /// Removes everything, keeping the collection and its indexes.
    pub fn clear(&self) -> Result<usize> {
        self.storage.write().clear(&self.name)
    }

    // ========== INDEX OPERATIONS ==========

    pub fn list_indexes(&self) -> Result<Vec<IndexDescriptor>> {
        self.storage.read().indexes(&self.name)
    }

    // ========== PRIVATE HELPERS ==========

    fn generate_id(&self) -> String {
        match &self.id_generator {
            Some(generate) => generate(),
            None => Uuid::new_v4().to_string(),
        }
    }
}

fn require_object(value: Value) -> Result<Document> {
    if !value.is_object() {
        return Err(StrataError::InvalidInput(format!(
            "cannot store a non-object document, got {}",
            json_type_name(&value)
        )));
    }
    Document::from_value(value)
}

// ============================================================================
// TESTS
// ============================================================================
