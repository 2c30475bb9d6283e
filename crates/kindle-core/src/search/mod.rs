mod matcher;
mod merge;

pub use matcher::{CHAR_SCORE, FuzzyMatcher, GAP_PENALTY, compare_rank};
pub use merge::{Batch, merge};

use crate::index::CacheSnapshot;
use kindle_types::{EntryKind, IndexedEntry};
use tracing::debug;

/// A matched entry and its score
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub entry: &'a IndexedEntry,
    pub score: i64,
}

/// Run every variant against every kind of `snapshot` and merge the results.
///
/// Each (variant, kind) list is capped at `per_kind` before merging.
pub fn lookup<'a>(
    matcher: &mut FuzzyMatcher,
    snapshot: &'a CacheSnapshot,
    variants: &[String],
    per_kind: usize,
) -> Vec<Candidate<'a>> {
    let mut batches = Vec::with_capacity(variants.len() * EntryKind::ALL.len());

    for (variant, query) in variants.iter().enumerate() {
        for kind in EntryKind::ALL {
            let candidates = matcher.rank(query, snapshot.of_kind(kind), per_kind);
            if !candidates.is_empty() {
                debug!("'{query}' matched {} {kind} entries", candidates.len());
            }
            batches.push(Batch {
                variant,
                kind,
                candidates,
            });
        }
    }

    merge(batches)
}
