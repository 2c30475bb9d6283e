use super::Candidate;
use crate::query::canonicalize;
use kindle_types::IndexedEntry;
use nucleo_matcher::{Config, Matcher, Utf32Str};
use std::cmp::Ordering;

/// Score per matched query character
pub const CHAR_SCORE: i64 = 16;

/// Penalty per label character skipped between the first and last match
pub const GAP_PENALTY: i64 = 2;

/// Fuzzy subsequence matcher.
///
/// nucleo decides whether the query is an in-order subsequence of the label;
/// the score comes from the narrowest window containing that subsequence so
/// that tighter matches always rank higher.
pub struct FuzzyMatcher {
    matcher: Matcher,
    haystack_buf: Vec<char>,
    needle_buf: Vec<char>,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
            haystack_buf: Vec::new(),
            needle_buf: Vec::new(),
        }
    }

    /// Score a canonical query against one label.
    ///
    /// Returns `None` unless every query character appears in the label in
    /// order. Matches always score at least 1.
    pub fn score_label(&mut self, query: &str, label: &str) -> Option<i64> {
        if query.is_empty() {
            return None;
        }

        let label = canonicalize(label);
        let needle = Utf32Str::new(query, &mut self.needle_buf);
        let haystack = Utf32Str::new(&label, &mut self.haystack_buf);
        let query_len = needle.len();

        self.matcher.fuzzy_match(haystack, needle)?;

        let query_chars: Vec<char> = query.chars().collect();
        let label_chars: Vec<char> = label.chars().collect();
        let span = i64::try_from(narrowest_span(&query_chars, &label_chars)?).unwrap_or(i64::MAX);
        let matched = i64::try_from(query_len).unwrap_or(i64::MAX / CHAR_SCORE);
        let gap = (span - matched).max(0);

        Some((matched * CHAR_SCORE - gap * GAP_PENALTY).max(1))
    }

    /// Best score over all of an entry's labels.
    pub fn score_entry(&mut self, query: &str, entry: &IndexedEntry) -> Option<i64> {
        entry
            .labels()
            .filter_map(|label| self.score_label(query, label))
            .max()
    }

    /// Score `entries`, drop non-matches, order by rank and keep `limit`.
    pub fn rank<'a>(
        &mut self,
        query: &str,
        entries: impl IntoIterator<Item = &'a IndexedEntry>,
        limit: usize,
    ) -> Vec<Candidate<'a>> {
        let mut scored: Vec<Candidate<'a>> = entries
            .into_iter()
            .filter_map(|entry| {
                self.score_entry(query, entry)
                    .map(|score| Candidate { entry, score })
            })
            .collect();

        scored.sort_by(compare_rank);
        scored.truncate(limit);
        scored
    }
}

/// Length of the shortest label window that contains `query` in order.
///
/// Each occurrence of the first query character starts a greedy forward
/// scan; the greedy scan yields the earliest end for that start.
fn narrowest_span(query: &[char], label: &[char]) -> Option<usize> {
    let (&head, rest) = query.split_first()?;
    let mut best: Option<usize> = None;

    for start in label
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c == head)
        .map(|(i, _)| i)
    {
        let mut end = start;
        let mut complete = true;
        for &wanted in rest {
            match label[end + 1..].iter().position(|&c| c == wanted) {
                Some(offset) => end += offset + 1,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            break;
        }
        let span = end - start + 1;
        if best.is_none_or(|b| span < b) {
            best = Some(span);
        }
    }

    best
}

/// Higher score first, then shorter name, then name, then stable id.
pub fn compare_rank(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| {
            a.entry
                .display_name
                .chars()
                .count()
                .cmp(&b.entry.display_name.chars().count())
        })
        .then_with(|| a.entry.display_name.cmp(&b.entry.display_name))
        .then_with(|| a.entry.stable_id.cmp(&b.entry.stable_id))
}
