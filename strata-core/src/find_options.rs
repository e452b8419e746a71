// strata-core/src/find_options.rs

use serde_json::Value;

use crate::error::{Result, StrataError};
use crate::query::filter::Filter;

/// Options accepted by `Collection::find`.
///
/// `limit: Some(0)` means zero results, not "no limit"; leave the field
/// `None` to read unbounded. `offset` skips raw scan positions before the
/// predicate is consulted.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub filter: Option<Filter>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        FindOptions::default()
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Parses the JSON options shape `{"where": ..., "limit": n, "offset": n}`.
    ///
    /// `null` stands for no options. Keys other than the three above are
    /// ignored; a present key with the wrong type is rejected.
    pub fn from_json(raw: &Value) -> Result<Self> {
        let map = match raw {
            Value::Null => return Ok(FindOptions::new()),
            Value::Object(map) => map,
            other => {
                return Err(StrataError::InvalidQuery(format!(
                    "find options must be an object, got {}",
                    crate::document::json_type_name(other)
                )))
            }
        };

        let mut options = FindOptions::new();
        if let Some(raw_filter) = map.get("where") {
            options.filter = Some(Filter::parse(raw_filter)?);
        }
        options.limit = parse_bound(map.get("limit"), "limit")?;
        options.offset = parse_bound(map.get("offset"), "offset")?;
        Ok(options)
    }
}

fn parse_bound(raw: Option<&Value>, name: &str) -> Result<Option<usize>> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_u64() {
            Some(n) => Ok(Some(n as usize)),
            None => Err(StrataError::InvalidQuery(format!(
                "'{}' must be a non-negative integer, got {}",
                name, value
            ))),
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================
