use crate::Result;
use crate::config::{Config, CustomCommand, Directories, RegisteredDirectory};
use crate::history::{SelectionLog, rank_by_history};
use crate::index::{CacheStore, CopyRenderer, IconCache, IconRenderer};
use crate::query::normalize;
use crate::scanner::{FsScanner, Scanner};
use crate::search::{FuzzyMatcher, lookup};
use crate::session::{Lookup, SearchSession};
use kindle_types::{EntryKind, IconRef, SearchResult, SelectionEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Core kindle engine.
///
/// Shared behind `Arc`: every method takes `&self` so a search session, a
/// config watcher and the front end can all hold the same instance.
pub struct KindleCore {
    dirs: Directories,
    config: RwLock<Config>,
    store: CacheStore,
    icons: IconCache,
    history: Mutex<SelectionLog>,

    /// Fixed scanner; when unset one is built from the current config
    scanner: Option<Arc<dyn Scanner>>,
}

/// Counts describing the current snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub applications: usize,
    pub directories: usize,
    pub commands: usize,
    pub history_events: usize,
    /// Milliseconds since the epoch, 0 if never built
    pub built_at: u64,
}

impl KindleCore {
    /// Open the engine on the given directories, loading config, cached
    /// snapshot and history from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or a state file
    /// exists but cannot be read.
    pub fn open(dirs: Directories) -> Result<Self> {
        dirs.ensure_exists()?;

        let config = Config::load(&dirs.config_file)?;

        debug!("Loading index from {}", dirs.index_cache.display());
        let store = match CacheStore::load(&dirs.index_cache) {
            Ok(store) => store,
            Err(e) => {
                warn!("Failed to load index: {}", e);
                CacheStore::in_memory()
            }
        };

        let history = match SelectionLog::load(&dirs.history_file, config.search.history_limit) {
            Ok(log) => log,
            Err(e) => {
                warn!("Failed to load history: {}", e);
                SelectionLog::new(config.search.history_limit)
            }
        };

        let icons = IconCache::new(&dirs.icon_cache, Arc::new(CopyRenderer));

        Ok(Self {
            dirs,
            config: RwLock::new(config),
            store,
            icons,
            history: Mutex::new(history),
            scanner: None,
        })
    }

    /// Assemble an engine from explicit parts, with an in-memory snapshot.
    #[must_use]
    pub fn with_parts(
        dirs: Directories,
        config: Config,
        scanner: Arc<dyn Scanner>,
        renderer: Arc<dyn IconRenderer>,
    ) -> Self {
        let history = SelectionLog::new(config.search.history_limit);
        Self {
            icons: IconCache::new(&dirs.icon_cache, renderer),
            dirs,
            config: RwLock::new(config),
            store: CacheStore::in_memory(),
            history: Mutex::new(history),
            scanner: Some(scanner),
        }
    }

    /// Rebuild when the cache is empty or the config asks for a startup
    /// refresh. Returns whether a rebuild ran.
    ///
    /// # Errors
    ///
    /// Returns an error if the rebuild fails.
    pub fn refresh_on_startup(&self) -> Result<bool> {
        let wanted = self.store.current().is_empty() || self.config().cache_update.update_on_startup;
        if wanted {
            self.refresh()?;
        }
        Ok(wanted)
    }

    /// Non-debounced search pipeline.
    ///
    /// Normalize, match every variant against every kind, merge, re-rank by
    /// history, cap and attach icons.
    #[must_use]
    pub fn search(&self, raw_query: &str) -> Vec<SearchResult> {
        let variants = normalize(raw_query);
        if variants.is_empty() {
            return Vec::new();
        }

        let (per_kind, max_results) = {
            let config = self.config();
            (
                config.search.max_results_per_kind,
                config.search.max_displayed_results,
            )
        };

        let snapshot = self.store.current();
        let mut matcher = FuzzyMatcher::new();
        let candidates = lookup(&mut matcher, &snapshot, &variants, per_kind);

        let icons: HashMap<&str, &IconRef> = candidates
            .iter()
            .filter_map(|c| c.entry.icon.as_ref().map(|i| (c.entry.stable_id.as_str(), i)))
            .collect();

        let mut results: Vec<SearchResult> = candidates
            .iter()
            .map(|c| SearchResult::from_entry(c.entry, c.score))
            .collect();

        rank_by_history(raw_query, &mut results, &self.history());
        results.truncate(max_results);

        for result in &mut results {
            if let Some(icon) = icons.get(result.path_or_alias.as_str()) {
                result.icon_path = self.icons.get(icon);
            }
        }

        debug!(
            "Search '{}' ({} variants) -> {} results",
            raw_query,
            variants.len(),
            results.len()
        );
        results
    }

    /// Debounced session driving this engine.
    #[must_use]
    pub fn session(self: &Arc<Self>) -> SearchSession {
        let debounce = Duration::from_millis(self.config().search.debounce_ms);
        SearchSession::new(Arc::clone(self) as Arc<dyn Lookup>, debounce)
    }

    /// Rescan and swap in a new snapshot, then drop stale icons.
    ///
    /// Returns the number of entries in the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::Scan` if scanning fails; the previous snapshot is kept.
    pub fn refresh(&self) -> Result<usize> {
        let scanner = self.scanner();
        let snapshot = self.store.rebuild(scanner.as_ref())?;

        let pruned = self
            .icons
            .prune(snapshot.entries().iter().filter_map(|e| e.icon.as_ref()));
        if pruned > 0 {
            debug!("Removed {pruned} stale icons");
        }

        Ok(snapshot.len())
    }

    fn scanner(&self) -> Arc<dyn Scanner> {
        match &self.scanner {
            Some(scanner) => Arc::clone(scanner),
            None => Arc::new(FsScanner::new(self.config().clone())),
        }
    }

    /// Append a completed launch to the history and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the history file cannot be written.
    pub fn record_selection(&self, keyword: &str, selected_id: &str) -> Result<()> {
        let mut history = self.history();
        if let Some(evicted) = history.record(keyword, selected_id) {
            debug!("History full, evicted '{}'", evicted.keyword);
        }
        history.save(&self.dirs.history_file)
    }

    /// Snapshot of the selection log, oldest first.
    #[must_use]
    pub fn history_events(&self) -> Vec<SelectionEvent> {
        self.history().events().cloned().collect()
    }

    /// # Errors
    ///
    /// Returns an error if the history file cannot be written.
    pub fn clear_history(&self) -> Result<()> {
        let mut history = self.history();
        history.clear();
        history.save(&self.dirs.history_file)
    }

    /// Reload config from disk and rebuild if it changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be read or the rebuild fails;
    /// on a read failure the existing config is kept.
    pub fn reload_config(&self) -> Result<usize> {
        let new_config = match Config::load(&self.dirs.config_file) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to reload config: {}", e);
                return Err(e);
            }
        };

        {
            let mut config = self.config_mut();
            if *config == new_config {
                debug!("Config unchanged, keeping snapshot");
                return Ok(self.store.current().len());
            }
            *config = new_config;
        }
        info!("Config reloaded");
        self.refresh()
    }

    /// Add or replace a registered directory, save and rebuild.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be saved or the rebuild fails.
    pub fn upsert_directory(&self, dir: RegisteredDirectory) -> Result<usize> {
        self.update_config(|config| {
            config.upsert_directory(dir);
            true
        })?;
        self.refresh()
    }

    /// Remove a registered directory. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be saved or the rebuild fails.
    pub fn remove_directory(&self, path: &str) -> Result<bool> {
        let removed = self.update_config(|config| config.remove_directory(path))?;
        if removed {
            self.refresh()?;
        }
        Ok(removed)
    }

    /// Add or replace a custom command, save and rebuild.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be saved or the rebuild fails.
    pub fn upsert_command(&self, command: CustomCommand) -> Result<usize> {
        self.update_config(|config| {
            config.upsert_command(command);
            true
        })?;
        self.refresh()
    }

    /// Remove a custom command. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be saved or the rebuild fails.
    pub fn remove_command(&self, alias: &str) -> Result<bool> {
        let removed = self.update_config(|config| config.remove_command(alias))?;
        if removed {
            self.refresh()?;
        }
        Ok(removed)
    }

    /// Apply `change` and save when it reports a modification.
    fn update_config(&self, change: impl FnOnce(&mut Config) -> bool) -> Result<bool> {
        let mut config = self.config_mut();
        if !change(&mut config) {
            return Ok(false);
        }
        config.save(&self.dirs.config_file)?;
        Ok(true)
    }

    /// Whether the snapshot is older than the configured update interval.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        let interval = self.config().cache_update.auto_update_interval_hours;
        self.store.needs_refresh(interval)
    }

    /// Remove every cached icon raster.
    ///
    /// # Errors
    ///
    /// Returns an error if the icon directory cannot be listed.
    pub fn clear_icon_cache(&self) -> Result<usize> {
        self.icons.clear()
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let snapshot = self.store.current();
        IndexStats {
            applications: snapshot.count_of(EntryKind::Application),
            directories: snapshot.count_of(EntryKind::Directory),
            commands: snapshot.count_of(EntryKind::Command),
            history_events: self.history().len(),
            built_at: snapshot.built_at,
        }
    }

    #[must_use]
    pub fn dirs(&self) -> &Directories {
        &self.dirs
    }

    /// Current configuration (read guard, keep it short-lived).
    pub fn config(&self) -> std::sync::RwLockReadGuard<'_, Config> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn config_mut(&self) -> std::sync::RwLockWriteGuard<'_, Config> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn history(&self) -> MutexGuard<'_, SelectionLog> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Lookup for KindleCore {
    fn lookup(&self, raw_query: &str) -> Vec<SearchResult> {
        self.search(raw_query)
    }
}
