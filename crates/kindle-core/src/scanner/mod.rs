//! Filesystem enumeration of launchable targets.
//!
//! The cache store treats a [`Scanner`] as an opaque producer: it is invoked
//! once per rebuild and either returns the full entry list or fails, in which
//! case the previous snapshot stays in place.

mod apps;
mod directories;

pub use apps::scan_applications;
pub use directories::scan_registered_directory;

use crate::config::{Config, CustomCommand, expand_home};
use crate::error::ScanError;
use kindle_types::IndexedEntry;
use tracing::{debug, info, warn};

/// Producer of indexable entries
pub trait Scanner: Send + Sync {
    /// Enumerate every entry the index should contain.
    ///
    /// # Errors
    ///
    /// Returns a `ScanError` when a source that should be readable is not.
    fn scan(&self) -> Result<Vec<IndexedEntry>, ScanError>;
}

impl<F> Scanner for F
where
    F: Fn() -> Result<Vec<IndexedEntry>, ScanError> + Send + Sync,
{
    fn scan(&self) -> Result<Vec<IndexedEntry>, ScanError> {
        self()
    }
}

/// Scanner driven by the user configuration
#[derive(Debug, Clone)]
pub struct FsScanner {
    config: Config,
}

/// Depth used when a registered directory asks for application scanning
const REGISTERED_APP_DEPTH: usize = 3;

impl FsScanner {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Scanner for FsScanner {
    fn scan(&self) -> Result<Vec<IndexedEntry>, ScanError> {
        let mut entries = Vec::new();

        for root in &self.config.apps.roots {
            let path = expand_home(&root.path);
            entries.extend(scan_applications(&path, root.max_depth)?);
        }

        for dir in &self.config.registered_directories {
            let path = expand_home(&dir.path);
            if !path.is_dir() {
                warn!("Registered directory not found, skipping: {}", path.display());
                continue;
            }

            if dir.scan_for_apps {
                entries.extend(scan_applications(&path, REGISTERED_APP_DEPTH)?);
            }

            entries.extend(scan_registered_directory(
                &path,
                dir,
                self.config.default_editor.as_deref(),
            )?);
        }

        entries.extend(command_entries(&self.config.custom_commands));

        info!("Scan produced {} entries", entries.len());
        Ok(entries)
    }
}

/// One entry per custom command alias.
#[must_use]
pub fn command_entries(commands: &[CustomCommand]) -> Vec<IndexedEntry> {
    commands
        .iter()
        .filter(|cmd| {
            let keep = !cmd.alias.trim().is_empty();
            if !keep {
                warn!("Ignoring custom command with empty alias: {:?}", cmd.command);
            }
            keep
        })
        .map(|cmd| {
            debug!("Indexing command alias '{}'", cmd.alias);
            IndexedEntry::command(
                cmd.alias.trim(),
                cmd.command.clone(),
                cmd.working_directory.clone(),
            )
        })
        .collect()
}
