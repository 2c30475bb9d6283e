//! Tests for `CacheStore`: rebuild swaps, failure handling and persistence

use super::fixtures::*;
use crate::error::ScanError;
use crate::index::{CacheStore, SNAPSHOT_FORMAT};
use crate::scanner::Scanner;
use kindle_types::{EntryKind, IndexedEntry};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_rebuild_replaces_whole_snapshot() {
    let store = CacheStore::in_memory();
    let scanner = ScriptedScanner::default();

    scanner.set_entries((0..10).map(|i| make_command(&format!("c{i}"))).collect());
    let first = store.rebuild(&scanner).unwrap();
    assert_eq!(first.len(), 10);

    scanner.set_entries(Vec::new());
    let second = store.rebuild(&scanner).unwrap();
    assert!(second.is_empty());
    assert!(store.current().is_empty());
    assert!(second.generation > first.generation);

    // Readers holding the old snapshot still see it
    assert_eq!(first.len(), 10);
}

#[test]
fn test_failed_rebuild_keeps_current() {
    let store = CacheStore::in_memory();
    let scanner = ScriptedScanner::default();

    scanner.set_entries(vec![make_command("gs"), make_command("gl")]);
    let built = store.rebuild(&scanner).unwrap();

    scanner.fail_with("disk on fire");
    let err = store.rebuild(&scanner).unwrap_err();
    assert!(matches!(err, ScanError::Other(_)));

    let current = store.current();
    assert!(Arc::ptr_eq(&built, &current));
    assert_eq!(current.len(), 2);
}

#[test]
fn test_rebuild_drops_vanished_paths() {
    let temp_dir = TempDir::new().unwrap();
    let present = make_app(temp_dir.path(), "Present");
    let vanished = IndexedEntry::application(
        temp_dir.path().join("Vanished.app").to_string_lossy(),
        "Vanished",
    );

    let store = CacheStore::in_memory();
    let scanner = ScriptedScanner::default();
    scanner.set_entries(vec![present.clone(), vanished, make_command("gs")]);

    let snapshot = store.rebuild(&scanner).unwrap();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.get(&present.stable_id).is_some());
    assert_eq!(snapshot.count_of(EntryKind::Application), 1);
}

#[test]
fn test_rebuild_dedups_stable_ids() {
    let store = CacheStore::in_memory();
    let scanner = ScriptedScanner::default();
    scanner.set_entries(vec![
        IndexedEntry::command("gs", "git status", None),
        IndexedEntry::command("gs", "git stash", None),
    ]);

    let snapshot = store.rebuild(&scanner).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot.get("gs").unwrap().target,
        IndexedEntry::command("gs", "git status", None).target
    );
}

#[test]
fn test_snapshot_persisted_and_reloaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("index.json");

    let store = CacheStore::load(&path).unwrap();
    assert!(store.current().is_empty());

    let scanner = ScriptedScanner::default();
    scanner.set_entries(vec![make_command("gs"), make_command("deploy")]);
    store.rebuild(&scanner).unwrap();
    assert!(path.exists());

    let reloaded = CacheStore::load(&path).unwrap();
    let snapshot = reloaded.current();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.version, SNAPSHOT_FORMAT);
    assert!(snapshot.built_at > 0);
    assert!(!reloaded.needs_refresh(1));
}

#[test]
fn test_corrupt_cache_loads_empty() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("index.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = CacheStore::load(&path).unwrap();
    assert!(store.current().is_empty());
    assert!(store.needs_refresh(6));
}

#[test]
fn test_closure_scanner() {
    let store = CacheStore::in_memory();
    let scanner = || -> Result<Vec<IndexedEntry>, ScanError> { Ok(vec![make_command("ls")]) };

    let snapshot = store.rebuild(&scanner as &dyn Scanner).unwrap();
    assert_eq!(snapshot.len(), 1);
}

#[test]
fn test_concurrent_readers_during_rebuild() {
    let store = Arc::new(CacheStore::in_memory());
    let scanner = Arc::new(ScriptedScanner::default());
    scanner.set_entries((0..100).map(|i| make_command(&format!("c{i}"))).collect());
    store.rebuild(scanner.as_ref()).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let len = store.current().len();
                    assert!(len == 100 || len == 50, "saw partial snapshot of {len}");
                }
            })
        })
        .collect();

    scanner.set_entries((0..50).map(|i| make_command(&format!("c{i}"))).collect());
    for _ in 0..20 {
        store.rebuild(scanner.as_ref()).unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.current().len(), 50);
}
