// strata-core/src/document.rs
// Schema-less document: a flat JSON object. The store attaches no meaning to
// any field except the collection's configured id key, and even that mapping
// lives in the collection config, not here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StrataError};

/// A single stored record. Wraps a JSON object; field order is not
/// significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    /// Empty document.
    pub fn new() -> Self {
        Document { fields: Map::new() }
    }

    /// Build a document from a JSON value. Anything but an object is
    /// rejected: scalars and arrays are not documents.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Document { fields }),
            other => Err(StrataError::InvalidInput(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Parses a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Document::from_value(value)
    }

    /// Serializes the document to JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.fields)?)
    }

    /// Field lookup. Top-level names only; there is no dot-path traversal.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Overlay `changes` onto this document: listed fields are replaced,
    /// everything else is kept. This is the merge `update` performs.
    pub fn merge(&mut self, changes: &Map<String, Value>) {
        for (field, value) in changes {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Document { fields }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl TryFrom<Value> for Document {
    type Error = StrataError;

    fn try_from(value: Value) -> Result<Self> {
        Document::from_value(value)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// TESTS
// ============================================================================
