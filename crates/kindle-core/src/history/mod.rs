//! Selection history and history-based re-ranking.
//!
//! Every launch appends a [`SelectionEvent`] to a bounded FIFO log. When
//! ranking, each candidate is classified against that log:
//!
//! - `Exact`: events whose keyword equals the query (case-insensitive)
//! - `Prefix`: otherwise, events whose keyword starts with the query
//! - `None`: no related event
//!
//! Candidates are then stable-sorted by match type and frequency, so the
//! matcher's order survives among equals.

use crate::Result;
use crate::query::canonicalize;
use crate::utils::{now_millis, write_atomic};
use kindle_types::{HistoryMatch, MatchType, SearchResult, SelectionEvent};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default log capacity
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Bounded, append-only log of past selections
#[derive(Debug, Clone)]
pub struct SelectionLog {
    events: VecDeque<SelectionEvent>,
    limit: usize,
}

impl Default for SelectionLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl SelectionLog {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            events: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Load the log from disk.
    ///
    /// A missing or corrupted file yields an empty log. Files holding more
    /// events than `limit` keep only the newest.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path, limit: usize) -> Result<Self> {
        let mut log = Self::new(limit);
        if !path.exists() {
            debug!("History not found at {}", path.display());
            return Ok(log);
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Vec<SelectionEvent>>(&content) {
            Ok(events) => {
                for event in events {
                    log.push(event);
                }
                info!("Loaded {} history events", log.len());
            }
            Err(e) => warn!("Failed to parse history, starting empty: {e}"),
        }
        Ok(log)
    }

    /// Persist the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string(&self.events)?;
        write_atomic(path, content.as_bytes())?;
        Ok(())
    }

    /// Record a launch made while `keyword` was typed.
    ///
    /// Returns the evicted event if the log was full.
    pub fn record(&mut self, keyword: &str, selected_id: &str) -> Option<SelectionEvent> {
        self.push(SelectionEvent {
            keyword: keyword.trim().to_string(),
            selected_id: selected_id.to_string(),
            timestamp: now_millis(),
        })
    }

    /// Append an event, evicting the oldest when over capacity.
    pub fn push(&mut self, event: SelectionEvent) -> Option<SelectionEvent> {
        self.events.push_back(event);
        if self.events.len() > self.limit {
            self.events.pop_front()
        } else {
            None
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &SelectionEvent> {
        self.events.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Classify `selected_id` against the log for the raw query.
    #[must_use]
    pub fn history_match(&self, raw_query: &str, selected_id: &str) -> HistoryMatch {
        let query = canonicalize(raw_query);
        if query.is_empty() {
            return HistoryMatch::none();
        }

        let mut exact = 0u32;
        let mut prefix = 0u32;
        for event in self.events.iter().filter(|e| e.selected_id == selected_id) {
            let keyword = canonicalize(&event.keyword);
            if keyword == query {
                exact = exact.saturating_add(1);
            } else if keyword.starts_with(&query) {
                prefix = prefix.saturating_add(1);
            }
        }

        if exact > 0 {
            HistoryMatch::exact(exact)
        } else if prefix > 0 {
            HistoryMatch::prefix(prefix)
        } else {
            HistoryMatch::none()
        }
    }
}

/// Attach history matches to `results` and stable-sort them.
///
/// Ordering is match type (exact, prefix, none) then frequency, both
/// descending. Equal keys keep their incoming order.
pub fn rank_by_history(raw_query: &str, results: &mut [SearchResult], log: &SelectionLog) {
    if log.is_empty() {
        return;
    }

    for result in results.iter_mut() {
        result.history = log.history_match(raw_query, &result.path_or_alias);
    }

    results.sort_by(|a, b| {
        b.history
            .match_type
            .cmp(&a.history.match_type)
            .then_with(|| b.history.frequency.cmp(&a.history.frequency))
    });

    let boosted = results
        .iter()
        .filter(|r| r.history.match_type != MatchType::None)
        .count();
    if boosted > 0 {
        debug!("History boosted {boosted} of {} results", results.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindle_types::IndexedEntry;

    fn event(keyword: &str, id: &str) -> SelectionEvent {
        SelectionEvent {
            keyword: keyword.to_string(),
            selected_id: id.to_string(),
            timestamp: 0,
        }
    }

    fn result(id: &str) -> SearchResult {
        SearchResult::from_entry(&IndexedEntry::command(id, "true", None), 10)
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut log = SelectionLog::new(3);
        for i in 0..3 {
            assert!(log.push(event(&format!("k{i}"), "a")).is_none());
        }
        let evicted = log.push(event("k3", "a")).unwrap();

        assert_eq!(evicted.keyword, "k0");
        assert_eq!(log.len(), 3);
        assert_eq!(log.events().next().unwrap().keyword, "k1");
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let mut log = SelectionLog::new(0);
        log.record("a", "x");
        log.record("b", "x");
        assert_eq!(log.len(), 1);
        assert_eq!(log.limit(), 1);
    }

    #[test]
    fn test_record_trims_keyword() {
        let mut log = SelectionLog::default();
        log.record("  saf ", "/Applications/Safari.app");
        let recorded = log.events().next().unwrap();
        assert_eq!(recorded.keyword, "saf");
        assert!(recorded.timestamp > 0);
    }

    #[test]
    fn test_exact_beats_prefix_count() {
        let mut log = SelectionLog::default();
        log.push(event("saf", "safari"));
        log.push(event("safari", "safari"));
        log.push(event("safari", "safari"));

        assert_eq!(log.history_match("saf", "safari"), HistoryMatch::exact(1));
        assert_eq!(log.history_match("sa", "safari"), HistoryMatch::prefix(3));
        assert_eq!(log.history_match("chrome", "safari"), HistoryMatch::none());
        assert_eq!(log.history_match("saf", "chrome"), HistoryMatch::none());
    }

    #[test]
    fn test_prefix_is_single_direction() {
        let mut log = SelectionLog::default();
        log.push(event("s", "safari"));

        assert_eq!(log.history_match("saf", "safari"), HistoryMatch::none());
    }

    #[test]
    fn test_blank_query_never_matches() {
        let mut log = SelectionLog::default();
        log.push(event("saf", "safari"));
        assert_eq!(log.history_match("   ", "safari"), HistoryMatch::none());
    }

    #[test]
    fn test_rank_is_stable() {
        let mut log = SelectionLog::default();
        log.push(event("no", "notes"));
        log.push(event("no", "notes"));
        log.push(event("nota", "notion"));

        let mut results = vec![
            result("nano"),
            result("notion"),
            result("node"),
            result("notes"),
            result("nomad"),
        ];
        rank_by_history("no", &mut results, &log);

        let ids: Vec<_> = results.iter().map(|r| r.path_or_alias.as_str()).collect();
        assert_eq!(ids, vec!["notes", "notion", "nano", "node", "nomad"]);
        assert_eq!(results[0].history, HistoryMatch::exact(2));
        assert_eq!(results[1].history, HistoryMatch::prefix(1));
    }

    #[test]
    fn test_rank_orders_by_frequency_within_type() {
        let mut log = SelectionLog::default();
        log.push(event("term", "iterm"));
        log.push(event("term", "warp"));
        log.push(event("term", "warp"));

        let mut results = vec![result("iterm"), result("warp")];
        rank_by_history("term", &mut results, &log);

        assert_eq!(results[0].path_or_alias, "warp");
        assert_eq!(results[1].path_or_alias, "iterm");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.json");

        let mut log = SelectionLog::new(5);
        log.record("saf", "/Applications/Safari.app");
        log.record("term", "/Applications/Utilities/Terminal.app");
        log.save(&path).unwrap();

        let loaded = SelectionLog::load(&path, 5).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.events().last().unwrap().selected_id,
            "/Applications/Utilities/Terminal.app"
        );
    }

    #[test]
    fn test_load_trims_to_limit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.json");

        let mut big = SelectionLog::new(10);
        for i in 0..10 {
            big.push(event(&format!("k{i}"), "x"));
        }
        big.save(&path).unwrap();

        let loaded = SelectionLog::load(&path, 4).unwrap();
        let keywords: Vec<_> = loaded.events().map(|e| e.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["k6", "k7", "k8", "k9"]);
    }

    #[test]
    fn test_load_corrupt_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.json");
        std::fs::write(&path, "[{\"keyword\": ").unwrap();

        let log = SelectionLog::load(&path, 50).unwrap();
        assert!(log.is_empty());
    }
}
