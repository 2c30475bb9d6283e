//! Tests for lookup across query variants and kinds, and merge determinism

use super::fixtures::*;
use crate::index::CacheSnapshot;
use crate::query::normalize;
use crate::search::{Batch, Candidate, FuzzyMatcher, lookup, merge};
use kindle_types::{EntryKind, EntryTarget, IndexedEntry};
use proptest::prelude::*;
use tempfile::TempDir;

fn snapshot_of(entries: Vec<IndexedEntry>) -> CacheSnapshot {
    CacheSnapshot::from_entries(entries, 1)
}

fn search(snapshot: &CacheSnapshot, raw: &str) -> Vec<String> {
    let mut matcher = FuzzyMatcher::new();
    lookup(&mut matcher, snapshot, &normalize(raw), 20)
        .iter()
        .map(|c| c.entry.display_name.clone())
        .collect()
}

#[test]
fn test_blank_query_matches_nothing() {
    let snapshot = snapshot_of(vec![make_command("gs")]);
    assert!(search(&snapshot, "").is_empty());
}

#[test]
fn test_hiragana_query_finds_latin_name() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot = snapshot_of(vec![
        make_app(temp_dir.path(), "Safari"),
        make_app(temp_dir.path(), "Mail"),
    ]);

    assert_eq!(search(&snapshot, "さふぁり"), vec!["Safari"]);
}

#[test]
fn test_hiragana_query_finds_katakana_name() {
    let temp_dir = TempDir::new().unwrap();
    let mut terminal = make_app(temp_dir.path(), "ターミナル");
    terminal.target = EntryTarget::Application {
        alternate_name: Some("Terminal".to_string()),
    };
    let snapshot = snapshot_of(vec![terminal]);

    assert_eq!(search(&snapshot, "たーみなる"), vec!["ターミナル"]);
    assert_eq!(search(&snapshot, "term"), vec!["ターミナル"]);
}

#[test]
fn test_full_width_query_matches() {
    let snapshot = snapshot_of(vec![make_command("deploy")]);
    assert_eq!(search(&snapshot, "ｄｅｐ"), vec!["deploy"]);
}

#[test]
fn test_keyword_label_matches() {
    let temp_dir = TempDir::new().unwrap();
    let projects = make_dir(temp_dir.path(), "Projects").with_keyword("work");
    let snapshot = snapshot_of(vec![projects]);

    assert_eq!(search(&snapshot, "work"), vec!["Projects"]);
}

#[test]
fn test_literal_variant_results_come_first() {
    let temp_dir = TempDir::new().unwrap();
    // Only the romanized variant reaches "Safari"
    let snapshot = snapshot_of(vec![
        make_app(temp_dir.path(), "Safari"),
        make_command("さくら"),
    ]);

    assert_eq!(search(&snapshot, "さ"), vec!["さくら", "Safari"]);
}

#[test]
fn test_per_kind_cap_applies_to_each_kind() {
    let temp_dir = TempDir::new().unwrap();
    let mut entries: Vec<IndexedEntry> = (0..5)
        .map(|i| make_command(&format!("tool{i}")))
        .collect();
    entries.extend((0..5).map(|i| make_dir(temp_dir.path(), &format!("tool-dir{i}"))));
    let snapshot = snapshot_of(entries);

    let mut matcher = FuzzyMatcher::new();
    let found = lookup(&mut matcher, &snapshot, &normalize("tool"), 2);
    let kinds: Vec<_> = found.iter().map(|c| c.entry.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            EntryKind::Directory,
            EntryKind::Directory,
            EntryKind::Command,
            EntryKind::Command
        ]
    );
}

#[test]
fn test_same_entry_from_two_variants_appears_once() {
    let snapshot = snapshot_of(vec![IndexedEntry::command("sakura", "open sakura", None)
        .with_keyword("さくら")]);

    // literal matches the keyword, romaji matches the alias
    assert_eq!(search(&snapshot, "さくら"), vec!["sakura"]);
}

fn fixed_batches(entries: &[IndexedEntry]) -> Vec<Batch<'_>> {
    fn candidate(entries: &[IndexedEntry], i: usize, score: i64) -> Candidate<'_> {
        Candidate {
            entry: &entries[i],
            score,
        }
    }
    vec![
        Batch {
            variant: 0,
            kind: EntryKind::Command,
            candidates: vec![candidate(entries, 0, 48), candidate(entries, 1, 32)],
        },
        Batch {
            variant: 0,
            kind: EntryKind::Directory,
            candidates: vec![candidate(entries, 2, 40)],
        },
        Batch {
            variant: 0,
            kind: EntryKind::Application,
            candidates: Vec::new(),
        },
        Batch {
            variant: 1,
            kind: EntryKind::Command,
            candidates: vec![candidate(entries, 1, 64), candidate(entries, 3, 16)],
        },
        Batch {
            variant: 1,
            kind: EntryKind::Directory,
            candidates: vec![candidate(entries, 4, 20), candidate(entries, 2, 60)],
        },
        Batch {
            variant: 2,
            kind: EntryKind::Command,
            candidates: vec![candidate(entries, 0, 1)],
        },
    ]
}

proptest! {
    #[test]
    fn prop_merge_is_independent_of_batch_order(
        order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let entries = vec![
            make_command("a"),
            make_command("b"),
            IndexedEntry::directory("/tmp/c", "c", None),
            make_command("d"),
            IndexedEntry::directory("/tmp/e", "e", None),
        ];

        let reference: Vec<(String, i64)> = merge(fixed_batches(&entries))
            .iter()
            .map(|c| (c.entry.stable_id.clone(), c.score))
            .collect();

        let mut batches: Vec<Option<Batch<'_>>> =
            fixed_batches(&entries).into_iter().map(Some).collect();
        let shuffled: Vec<Batch<'_>> = order
            .iter()
            .filter_map(|&i| batches[i].take())
            .collect();
        let merged: Vec<(String, i64)> = merge(shuffled)
            .iter()
            .map(|c| (c.entry.stable_id.clone(), c.score))
            .collect();

        prop_assert_eq!(&merged, &reference);
        prop_assert_eq!(
            reference,
            vec![
                ("/tmp/c".to_string(), 40),
                ("a".to_string(), 48),
                ("b".to_string(), 32),
                ("/tmp/e".to_string(), 20),
                ("d".to_string(), 16),
            ]
        );
    }
}
