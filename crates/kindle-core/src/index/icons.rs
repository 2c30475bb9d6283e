//! Disk cache of rendered icon rasters.
//!
//! Each raster is named after the SHA-256 of its source identity, which
//! includes the source file's modification marker. Changing the source file
//! therefore yields a new name, and the stale raster is removed by [`IconCache::prune`].

use crate::{Error, Result};
use kindle_types::IconRef;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

const RASTER_EXTENSION: &str = "png";

/// Produces a raster for an icon source.
pub trait IconRenderer: Send + Sync {
    /// Render `icon` into a raster file at `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be rendered.
    fn render(&self, icon: &IconRef, target: &Path) -> Result<()>;
}

/// Renderer that copies the source bytes unchanged.
///
/// Suitable for sources that already are rasters (`.png` icons referenced by
/// desktop files).
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyRenderer;

impl IconRenderer for CopyRenderer {
    fn render(&self, icon: &IconRef, target: &Path) -> Result<()> {
        std::fs::copy(&icon.source_path, target).map_err(|e| {
            Error::Icon(format!("cannot copy {}: {e}", icon.source_path.display()))
        })?;
        Ok(())
    }
}

/// Owned handle to the raster directory, shared by reference.
pub struct IconCache {
    dir: PathBuf,
    renderer: Arc<dyn IconRenderer>,
    memo: Mutex<HashMap<String, PathBuf>>,
}

impl IconCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, renderer: Arc<dyn IconRenderer>) -> Self {
        Self {
            dir: dir.into(),
            renderer,
            memo: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic raster location for an identity.
    #[must_use]
    pub fn raster_path(&self, identity: &str) -> PathBuf {
        self.dir.join(raster_file_name(identity))
    }

    /// Raster for `icon`, rendering it on first request.
    ///
    /// Returns `None` when rendering fails; failures are not memoized so a
    /// later request retries.
    pub fn get(&self, icon: &IconRef) -> Option<PathBuf> {
        let identity = icon.identity();
        if let Some(path) = self.memo().get(&identity) {
            return Some(path.clone());
        }

        let target = self.raster_path(&identity);
        if !target.is_file() {
            if let Err(e) = self.render_into(icon, &target) {
                warn!("Icon render failed for {}: {e}", icon.source_path.display());
                return None;
            }
            debug!("Rendered icon {} -> {}", identity, target.display());
        }

        self.memo().insert(identity, target.clone());
        Some(target)
    }

    /// Render through a uniquely named temp file so concurrent renders of the
    /// same identity never share a path.
    fn render_into(&self, icon: &IconRef, target: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let tmp = tempfile::Builder::new()
            .prefix(".render-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?
            .into_temp_path();

        self.renderer.render(icon, &tmp)?;

        if let Err(e) = tmp.persist(target) {
            if target.is_file() {
                debug!("Raster {} was written concurrently", target.display());
                return Ok(());
            }
            return Err(e.error.into());
        }
        Ok(())
    }

    /// Delete rasters whose identity is not among `valid`.
    ///
    /// Returns the number of files removed.
    pub fn prune<'a>(&self, valid: impl IntoIterator<Item = &'a IconRef>) -> usize {
        let keep: HashSet<String> = valid
            .into_iter()
            .map(|icon| raster_file_name(&icon.identity()))
            .collect();

        let Ok(listing) = std::fs::read_dir(&self.dir) else {
            return 0;
        };

        let mut removed = 0;
        for entry in listing.filter_map(std::result::Result::ok) {
            let name = entry.file_name().to_string_lossy().to_string();
            if keep.contains(&name) {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => debug!("Could not remove stale icon {name}: {e}"),
            }
        }

        if removed > 0 {
            self.memo().retain(|_, path| path.exists());
            debug!("Pruned {removed} stale icons");
        }
        removed
    }

    /// Remove every cached raster.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub fn clear(&self) -> Result<usize> {
        self.memo().clear();
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)?.filter_map(std::result::Result::ok) {
            if entry.path().is_file() && std::fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn memo(&self) -> std::sync::MutexGuard<'_, HashMap<String, PathBuf>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn raster_file_name(identity: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    format!("{}.{RASTER_EXTENSION}", hex::encode(digest))
}
