use super::CacheSnapshot;
use crate::Result;
use crate::error::ScanError;
use crate::scanner::Scanner;
use crate::utils::{now_millis, write_atomic};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

const MILLIS_PER_HOUR: u64 = 60 * 60 * 1000;

/// Holds the current snapshot and swaps in new ones built by a scanner.
///
/// Readers clone an `Arc` under a read lock that is held only for the clone,
/// so a lookup never waits on a scan. Rebuilds are serialized among
/// themselves and only take the write lock for the pointer swap.
pub struct CacheStore {
    current: RwLock<Arc<CacheSnapshot>>,
    rebuilding: Mutex<()>,
    generation: AtomicU64,
    path: Option<PathBuf>,
}

impl CacheStore {
    /// Store that is never persisted
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_snapshot(CacheSnapshot::empty(), None)
    }

    fn with_snapshot(snapshot: CacheSnapshot, path: Option<PathBuf>) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            rebuilding: Mutex::new(()),
            generation: AtomicU64::new(0),
            path,
        }
    }

    /// Load the persisted snapshot, falling back to empty when it is missing
    /// or cannot be parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Index cache not found at {}", path.display());
            return Ok(Self::with_snapshot(CacheSnapshot::empty(), Some(path.to_path_buf())));
        }

        debug!("Loading index cache from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let snapshot = match serde_json::from_str::<CacheSnapshot>(&content) {
            Ok(mut snapshot) => {
                snapshot.dedup_loaded();
                info!("Loaded {} cached entries", snapshot.len());
                snapshot
            }
            Err(e) => {
                warn!(
                    "Failed to parse index cache: {} (at line {}, column {})",
                    e,
                    e.line(),
                    e.column()
                );
                CacheSnapshot::empty()
            }
        };

        Ok(Self::with_snapshot(snapshot, Some(path.to_path_buf())))
    }

    /// The last successfully built snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Scan and atomically replace the current snapshot.
    ///
    /// The new snapshot is assembled without holding any lock readers need.
    /// On failure the previous snapshot is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the scanner's error unchanged.
    pub fn rebuild(&self, scanner: &dyn Scanner) -> std::result::Result<Arc<CacheSnapshot>, ScanError> {
        let _guard = self.rebuilding.lock().unwrap_or_else(PoisonError::into_inner);

        let entries = match scanner.scan() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Rebuild failed, keeping previous snapshot: {e}");
                return Err(e);
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot =
            Arc::new(CacheSnapshot::from_entries(entries, now_millis()).with_generation(generation));

        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *current = Arc::clone(&snapshot);
        }
        info!(
            "Rebuilt cache: {} entries (generation {generation})",
            snapshot.len()
        );

        if let Err(e) = self.persist(&snapshot) {
            warn!("Failed to persist index cache: {e}");
        }

        Ok(snapshot)
    }

    fn persist(&self, snapshot: &CacheSnapshot) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = serde_json::to_string(snapshot)?;
        write_atomic(path, content.as_bytes())?;
        debug!("Saved {} entries to {}", snapshot.len(), path.display());
        Ok(())
    }

    /// Whether the current snapshot is older than `interval_hours`.
    ///
    /// A snapshot that was never built always needs a refresh.
    #[must_use]
    pub fn needs_refresh(&self, interval_hours: u32) -> bool {
        let built_at = self.current().built_at;
        if built_at == 0 {
            return true;
        }
        let age = now_millis().saturating_sub(built_at);
        age >= u64::from(interval_hours) * MILLIS_PER_HOUR
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindle_types::IndexedEntry;

    fn commands(n: usize) -> impl Scanner {
        move || -> std::result::Result<Vec<IndexedEntry>, ScanError> {
            Ok((0..n)
                .map(|i| IndexedEntry::command(format!("cmd{i}"), "true", None))
                .collect())
        }
    }

    #[test]
    fn test_in_memory_starts_empty() {
        let store = CacheStore::in_memory();
        assert!(store.current().is_empty());
        assert!(store.needs_refresh(6));
    }

    #[test]
    fn test_rebuild_swaps_snapshot() {
        let store = CacheStore::in_memory();
        let before = store.current();

        let built = store.rebuild(&commands(3)).unwrap();

        assert_eq!(built.len(), 3);
        assert_eq!(built.generation, 1);
        assert_eq!(store.current().len(), 3);
        assert!(before.is_empty());
        assert!(!store.needs_refresh(6));
    }

    #[test]
    fn test_failed_rebuild_keeps_previous() {
        let store = CacheStore::in_memory();
        store.rebuild(&commands(2)).unwrap();

        let failing = || -> std::result::Result<Vec<IndexedEntry>, ScanError> {
            Err(ScanError::Other("disk on fire".into()))
        };
        let err = store.rebuild(&failing).unwrap_err();

        assert!(err.to_string().contains("disk on fire"));
        assert_eq!(store.current().len(), 2);
        assert_eq!(store.current().generation, 1);
    }

    #[test]
    fn test_needs_refresh_zero_interval() {
        let store = CacheStore::in_memory();
        store.rebuild(&commands(1)).unwrap();
        assert!(store.needs_refresh(0));
    }

    #[test]
    fn test_persist_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("index.json");

        let store = CacheStore::load(&path).unwrap();
        store.rebuild(&commands(4)).unwrap();
        assert!(path.exists());

        let reloaded = CacheStore::load(&path).unwrap();
        assert_eq!(reloaded.current().len(), 4);
        assert_eq!(reloaded.current().built_at, store.current().built_at);
    }

    #[test]
    fn test_load_corrupt_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("index.json");
        std::fs::write(&path, "{\"entries\": [").unwrap();

        let store = CacheStore::load(&path).unwrap();
        assert!(store.current().is_empty());
    }
}
