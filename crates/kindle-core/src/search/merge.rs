use super::Candidate;
use kindle_types::EntryKind;
use std::collections::HashSet;

/// Ranked matches of one query variant within one entry kind.
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    /// Position of the variant in the normalizer output
    pub variant: usize,
    pub kind: EntryKind,
    pub candidates: Vec<Candidate<'a>>,
}

/// Combine batches into one list deduplicated by stable id.
///
/// Batches are first put in canonical (variant, kind) order, so the output
/// does not depend on the order in which batches arrived. Within that order
/// the first occurrence of a stable id wins.
#[must_use]
pub fn merge<'a>(mut batches: Vec<Batch<'a>>) -> Vec<Candidate<'a>> {
    batches.sort_by_key(|batch| (batch.variant, batch.kind));

    let mut seen: HashSet<&'a str> = HashSet::new();
    batches
        .into_iter()
        .flat_map(|batch| batch.candidates)
        .filter(|candidate| seen.insert(candidate.entry.stable_id.as_str()))
        .collect()
}
