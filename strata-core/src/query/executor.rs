// strata-core/src/query/executor.rs
// Pull loop that drives a storage cursor and accumulates matches.

use crate::document::Document;
use crate::error::Result;
use crate::find_options::FindOptions;
use crate::log_trace;
use crate::storage::Cursor;

/// Drains `cursor` according to `options` and returns matched documents in
/// visit order.
///
/// The loop checks the limit before pulling, so once enough matches exist the
/// cursor is never advanced again (and `limit: Some(0)` never advances at
/// all). Offset skips raw scan positions, counted before the predicate runs.
/// A cursor fault aborts the whole find; partial matches are discarded.
pub fn execute(cursor: &mut dyn Cursor, options: &FindOptions) -> Result<Vec<Document>> {
    let mut matched = Vec::new();
    let mut skipped = 0usize;

    loop {
        if let Some(limit) = options.limit {
            if matched.len() >= limit {
                break;
            }
        }

        let document = match cursor.advance()? {
            Some(document) => document,
            None => break,
        };

        if let Some(offset) = options.offset {
            if skipped < offset {
                skipped += 1;
                continue;
            }
        }

        let keep = match &options.filter {
            Some(filter) => filter.matches(&document),
            None => true,
        };
        if keep {
            matched.push(document);
        }
    }

    log_trace!("scan finished with {} matching document(s)", matched.len());
    Ok(matched)
}

// ============================================================================
// TESTS
// ============================================================================
