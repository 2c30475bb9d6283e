use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Main configuration.
///
/// Everything the scanner indexes comes from here: registered directories,
/// custom command aliases and application roots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub apps: AppConfig,

    #[serde(default)]
    pub registered_directories: Vec<RegisteredDirectory>,

    #[serde(default)]
    pub custom_commands: Vec<CustomCommand>,

    #[serde(default)]
    pub cache_update: CacheUpdateSettings,

    #[serde(default)]
    pub default_terminal: TerminalType,

    /// Editor used when a directory entry has none of its own
    #[serde(default)]
    pub default_editor: Option<String>,
}

impl Config {
    /// Load config from file.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// parsed is copied to `<name>.backup` and the defaults are used, so a
    /// bad edit never stops the launcher from starting.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::validation::warn_unknown_fields(&content, "config.json");

        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(
                    "Config file corrupted: {} (at line {}, column {})",
                    e,
                    e.line(),
                    e.column()
                );
                let backup = backup_path(path);
                match std::fs::copy(path, &backup) {
                    Ok(_) => warn!("Backed up corrupted config to {}", backup.display()),
                    Err(copy_err) => warn!("Failed to back up corrupted config: {copy_err}"),
                }
                Ok(Self::default())
            }
        }
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        crate::utils::write_atomic(path, content.as_bytes())?;
        Ok(())
    }

    /// Add a registered directory, replacing any entry with the same path.
    pub fn upsert_directory(&mut self, dir: RegisteredDirectory) {
        if let Some(existing) = self
            .registered_directories
            .iter_mut()
            .find(|d| d.path == dir.path)
        {
            *existing = dir;
        } else {
            self.registered_directories.push(dir);
        }
    }

    /// Remove a registered directory. Returns whether anything was removed.
    pub fn remove_directory(&mut self, path: &str) -> bool {
        let before = self.registered_directories.len();
        self.registered_directories.retain(|d| d.path != path);
        before != self.registered_directories.len()
    }

    /// Add a custom command, replacing any command with the same alias.
    pub fn upsert_command(&mut self, cmd: CustomCommand) {
        if let Some(existing) = self.custom_commands.iter_mut().find(|c| c.alias == cmd.alias) {
            *existing = cmd;
        } else {
            self.custom_commands.push(cmd);
        }
    }

    /// Remove a custom command. Returns whether anything was removed.
    pub fn remove_command(&mut self, alias: &str) -> bool {
        let before = self.custom_commands.len();
        self.custom_commands.retain(|c| c.alias != alias);
        before != self.custom_commands.len()
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

/// Search tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Delay between the last keystroke and the search
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Matches kept per entry kind before merging
    #[serde(default = "default_max_per_kind")]
    pub max_results_per_kind: usize,

    #[serde(default = "default_max_results")]
    pub max_displayed_results: usize,

    /// Selection log capacity
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_debounce() -> u64 {
    150
}
fn default_max_per_kind() -> usize {
    20
}
fn default_max_results() -> usize {
    50
}
fn default_history_limit() -> usize {
    50
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
            max_results_per_kind: default_max_per_kind(),
            max_displayed_results: default_max_results(),
            history_limit: default_history_limit(),
        }
    }
}

/// Where installed applications are looked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_app_roots")]
    pub roots: Vec<AppRoot>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            roots: default_app_roots(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoot {
    /// Directory to walk; a leading `~` is expanded to the home directory
    pub path: String,

    #[serde(default = "default_root_depth")]
    pub max_depth: usize,
}

fn default_root_depth() -> usize {
    2
}

fn default_app_roots() -> Vec<AppRoot> {
    #[cfg(target_os = "macos")]
    {
        vec![
            AppRoot {
                path: "/Applications".to_string(),
                max_depth: 2,
            },
            // Chrome apps live one level deeper
            AppRoot {
                path: "~/Applications".to_string(),
                max_depth: 3,
            },
        ]
    }

    #[cfg(not(target_os = "macos"))]
    {
        vec![
            AppRoot {
                path: "/usr/share/applications".to_string(),
                max_depth: 1,
            },
            AppRoot {
                path: "~/.local/share/applications".to_string(),
                max_depth: 1,
            },
        ]
    }
}

/// How a registered directory (or its children) is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    /// Not indexed
    #[default]
    None,
    /// Opened in the file manager
    Finder,
    /// Opened with the configured editor
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalType {
    #[default]
    Terminal,
    Iterm2,
    Warp,
}

/// A user-registered directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredDirectory {
    pub path: String,

    #[serde(default)]
    pub parent_open_mode: OpenMode,

    #[serde(default)]
    pub parent_editor: Option<String>,

    /// Search keyword for the directory itself; the folder name when unset
    #[serde(default)]
    pub parent_search_keyword: Option<String>,

    #[serde(default)]
    pub subdirs_open_mode: OpenMode,

    #[serde(default)]
    pub subdirs_editor: Option<String>,

    /// Also index application bundles found under this directory
    #[serde(default)]
    pub scan_for_apps: bool,
}

impl RegisteredDirectory {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            parent_open_mode: OpenMode::Finder,
            parent_editor: None,
            parent_search_keyword: None,
            subdirs_open_mode: OpenMode::None,
            subdirs_editor: None,
            scan_for_apps: false,
        }
    }
}

/// A user-defined shell alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCommand {
    pub alias: String,
    pub command: String,

    /// Defaults to the home directory when unset
    #[serde(default)]
    pub working_directory: Option<String>,
}

/// When the cache is rebuilt without a manual trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheUpdateSettings {
    #[serde(default = "default_true")]
    pub update_on_startup: bool,

    #[serde(default = "default_true")]
    pub auto_update_enabled: bool,

    #[serde(default = "default_interval_hours")]
    pub auto_update_interval_hours: u32,
}

fn default_true() -> bool {
    true
}
fn default_interval_hours() -> u32 {
    6
}

impl Default for CacheUpdateSettings {
    fn default() -> Self {
        Self {
            update_on_startup: true,
            auto_update_enabled: true,
            auto_update_interval_hours: default_interval_hours(),
        }
    }
}
