// strata-core/src/index.rs
// Ordered keys for primary and secondary scans, plus index metadata.
//
// Every scan this layer consumes is ordered, so keys need a total order even
// across value types. The cross-type rank is fixed: null < booleans <
// numbers < strings < encoded non-scalars. Integers and floats share one
// numeric domain, which keeps `2` and `2.0` the same key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::value_utils::canonical_json_string;

/// f64 with a total order (IEEE total ordering, NaN sorts above +inf).
#[derive(Debug, Clone, Copy)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for OrderedFloat {}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Primary or secondary key derived from a document field value.
///
/// Non-scalar values (arrays, objects) are keyed through their canonical
/// JSON text: deterministic, and it keeps every field-bearing document
/// visible to an index scan.
#[derive(Debug, Clone)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat),
    String(String),
    Encoded(String),
}

impl Key {
    /// Derive the key for a field value.
    pub fn from_value(value: &Value) -> Key {
        match value {
            Value::Null => Key::Null,
            Value::Bool(b) => Key::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Key::Int(i),
                // Huge u64s and fractional numbers land here.
                None => Key::Float(OrderedFloat(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => Key::String(s.clone()),
            other => Key::Encoded(canonical_json_string(other)),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Key::Null => 0,
            Key::Bool(_) => 1,
            Key::Int(_) | Key::Float(_) => 2,
            Key::String(_) => 3,
            Key::Encoded(_) => 4,
        }
    }
}

impl From<&Value> for Key {
    fn from(value: &Value) -> Self {
        Key::from_value(value)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        use Key::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.cmp(b),
            (Int(a), Float(b)) => OrderedFloat(*a as f64).cmp(b),
            (Float(a), Int(b)) => a.cmp(&OrderedFloat(*b as f64)),
            (String(a), String(b)) => a.cmp(b),
            (Encoded(a), Encoded(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Null => write!(f, "null"),
            Key::Bool(b) => write!(f, "{}", b),
            Key::Int(i) => write!(f, "{}", i),
            Key::Float(x) => write!(f, "{}", x.0),
            Key::String(s) => write!(f, "{}", s),
            Key::Encoded(e) => write!(f, "{}", e),
        }
    }
}

/// A declared single-field index: scan in ascending order of `key_path`'s
/// value. `unique` additionally rejects duplicate keys on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub key_path: String,
    pub unique: bool,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>, key_path: impl Into<String>) -> Self {
        IndexDescriptor {
            name: name.into(),
            key_path: key_path.into(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================
