// strata-core/src/error.rs
// Error taxonomy for the whole crate.

use thiserror::Error;

/// All errors surfaced by strata-core.
#[derive(Error, Debug)]
pub enum StrataError {
    /// A filter or find-options payload that cannot be parsed into a valid
    /// query (non-object filter node, non-array `$in` operand, bad regex,
    /// unknown operator under strict parsing, negative limit, ...).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Caller handed us a document payload we cannot accept (non-object
    /// insert, attempt to rewrite the id key, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The named collection does not exist.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Attempt to create a collection that already exists.
    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    /// Lookup by primary key found nothing.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Index trouble: unknown index name, unique-key violation.
    #[error("Index error: {0}")]
    IndexError(String),

    /// The storage layer handed back something unreadable mid-scan.
    #[error("Data corruption: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StrataError>;
