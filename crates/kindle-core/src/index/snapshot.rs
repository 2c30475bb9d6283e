use kindle_types::{EntryKind, IndexedEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// On-disk format version of the persisted snapshot
pub const SNAPSHOT_FORMAT: u32 = 1;

fn default_format() -> u32 {
    SNAPSHOT_FORMAT
}

/// Immutable set of indexed entries produced by one rebuild.
///
/// Snapshots are shared behind `Arc` and never mutated after construction;
/// a rebuild produces a new one and swaps it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    #[serde(default = "default_format")]
    pub version: u32,

    /// Build time in milliseconds since the epoch (0 = never built)
    #[serde(default)]
    pub built_at: u64,

    /// Process-local rebuild counter, not persisted
    #[serde(skip)]
    pub generation: u64,

    #[serde(default)]
    entries: Vec<IndexedEntry>,
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl CacheSnapshot {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_FORMAT,
            built_at: 0,
            generation: 0,
            entries: Vec::new(),
        }
    }

    /// Build a snapshot from raw scanner output.
    ///
    /// Duplicate stable ids keep their first occurrence, and path-backed
    /// entries whose path no longer exists are dropped.
    #[must_use]
    pub fn from_entries(entries: Vec<IndexedEntry>, built_at: u64) -> Self {
        let mut seen = HashSet::with_capacity(entries.len());
        let total = entries.len();

        let entries: Vec<_> = entries
            .into_iter()
            .filter(|entry| {
                if entry.is_path_backed() && !Path::new(&entry.stable_id).exists() {
                    debug!("Dropping entry with missing path: {}", entry.stable_id);
                    return false;
                }
                if !seen.insert(entry.stable_id.clone()) {
                    debug!("Dropping duplicate entry: {}", entry.stable_id);
                    return false;
                }
                true
            })
            .collect();

        if entries.len() != total {
            debug!("Snapshot kept {} of {} scanned entries", entries.len(), total);
        }

        Self {
            version: SNAPSHOT_FORMAT,
            built_at,
            generation: 0,
            entries,
        }
    }

    #[must_use]
    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Drop entries that violate snapshot invariants after loading from disk.
    ///
    /// Only stable id uniqueness is enforced here; paths are re-checked by the
    /// next rebuild.
    pub(crate) fn dedup_loaded(&mut self) {
        let mut seen = HashSet::with_capacity(self.entries.len());
        self.entries.retain(|e| seen.insert(e.stable_id.clone()));
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexedEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, stable_id: &str) -> Option<&IndexedEntry> {
        self.entries.iter().find(|e| e.stable_id == stable_id)
    }

    pub fn of_kind(&self, kind: EntryKind) -> impl Iterator<Item = &IndexedEntry> {
        self.entries.iter().filter(move |e| e.kind() == kind)
    }

    #[must_use]
    pub fn count_of(&self, kind: EntryKind) -> usize {
        self.of_kind(kind).count()
    }
}
