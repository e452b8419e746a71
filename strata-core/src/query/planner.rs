// strata-core/src/query/planner.rs
// Picks the scan source for a find. Selection never changes which documents
// match, only the order the scan visits them in.

use crate::index::IndexDescriptor;
use crate::query::filter::Filter;
use crate::storage::ScanSource;

/// Returns the first declared index whose key path appears as a top-level
/// equality field of the filter, or `None` when no index is usable.
///
/// Only bare `field: value` entries count. Fields mentioned inside modifier
/// maps (`$gt: {age: 2}`) or inside `$and`/`$or` branches are not
/// candidates: their matched sets are not single-value slices of the index.
pub fn select_index<'a>(
    filter: Option<&Filter>,
    indexes: &'a [IndexDescriptor],
) -> Option<&'a IndexDescriptor> {
    let filter = filter?;
    indexes.iter().find(|descriptor| {
        filter
            .top_level_fields()
            .any(|field| field == descriptor.key_path)
    })
}

/// Resolves a filter to the scan source the executor should read from.
pub fn plan_scan(filter: Option<&Filter>, indexes: &[IndexDescriptor]) -> ScanSource {
    match select_index(filter, indexes) {
        Some(descriptor) => ScanSource::Index(descriptor.name.clone()),
        None => ScanSource::Primary,
    }
}

// ============================================================================
// TESTS
// ============================================================================
