use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};

/// Application directories following XDG (or the platform equivalent)
#[derive(Debug, Clone)]
pub struct Directories {
    /// Config directory (~/.config/kindle)
    pub config: PathBuf,

    /// Data directory (~/.local/share/kindle)
    pub data: PathBuf,

    /// Cache directory (~/.cache/kindle)
    pub cache: PathBuf,

    /// Config file path
    pub config_file: PathBuf,

    /// Persisted cache snapshot
    pub index_cache: PathBuf,

    /// Selection history log
    pub history_file: PathBuf,

    /// Rendered icon rasters
    pub icon_cache: PathBuf,
}

impl Directories {
    /// Create a new `Directories` instance with standard platform paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the system's project directories cannot be determined.
    pub fn new() -> crate::Result<Self> {
        let project = ProjectDirs::from("", "", "kindle").ok_or_else(|| {
            crate::Error::Config("Failed to determine project directories".to_string())
        })?;

        let config = project.config_dir().to_path_buf();
        let data = project.data_dir().to_path_buf();
        let cache = project.cache_dir().to_path_buf();

        Ok(Self {
            config_file: config.join("config.json"),
            index_cache: cache.join("index.json"),
            history_file: data.join("history.json"),
            icon_cache: cache.join("icons"),
            config,
            data,
            cache,
        })
    }

    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.json"),
            index_cache: base.join("index.json"),
            history_file: base.join("history.json"),
            icon_cache: base.join("icons"),
            config: base.clone(),
            data: base.clone(),
            cache: base,
        }
    }

    /// Ensure all directories exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config)?;
        std::fs::create_dir_all(&self.data)?;
        std::fs::create_dir_all(&self.cache)?;
        std::fs::create_dir_all(&self.icon_cache)?;
        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory.
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    let Some(rest) = path.strip_prefix('~') else {
        return PathBuf::from(path);
    };

    match BaseDirs::new() {
        Some(base) => {
            let home = base.home_dir();
            let rest = rest.trim_start_matches(['/', '\\']);
            if rest.is_empty() {
                home.to_path_buf()
            } else {
                home.join(Path::new(rest))
            }
        }
        None => PathBuf::from(path),
    }
}
