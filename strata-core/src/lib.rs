// strata-core/src/lib.rs
// Embedded query layer over an ordered document store.

pub mod collection;
pub mod database;
pub mod document;
pub mod error;
pub mod find_options;
pub mod index;
pub mod logging;
pub mod query;
pub mod storage;
pub mod value_utils;

// Public exports
pub use collection::Collection;
pub use database::Database;
pub use document::Document;
pub use error::{Result, StrataError};
pub use find_options::FindOptions;
pub use index::{IndexDescriptor, Key, OrderedFloat};
pub use logging::{init_logging_from_env, log_level, set_log_level, LogLevel};
pub use query::{Clause, Filter, ParseMode};
pub use storage::{CollectionConfig, Cursor, MemoryStore, ScanSource, Storage};
