//! Configuration file watcher for hot-reload support.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, info};

const RELOAD_SETTLE_DELAY: Duration = Duration::from_millis(100);
const CONFIG_DEBOUNCE_DURATION: Duration = Duration::from_millis(500);

pub struct ConfigWatcher {
    _watcher_thread: std::thread::JoinHandle<()>,
}

/// Watch the directory holding `config_path` and send `()` on `tx` after
/// the file settles following a change.
pub fn spawn_config_watcher(
    config_path: PathBuf,
    tx: tokio_mpsc::UnboundedSender<()>,
) -> ConfigWatcher {
    let watcher_thread = std::thread::spawn(move || {
        if let Err(e) = watch_config_file(&config_path, &tx) {
            error!("Config watcher error: {e:#}");
        }
    });

    ConfigWatcher {
        _watcher_thread: watcher_thread,
    }
}

fn watch_config_file(config_path: &Path, tx: &tokio_mpsc::UnboundedSender<()>) -> Result<()> {
    let parent = config_path
        .parent()
        .context("Config path has no parent directory")?;
    let file_name = config_path.file_name().map(ToOwned::to_owned);

    let (debounce_tx, debounce_rx) = mpsc::channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(CONFIG_DEBOUNCE_DURATION, debounce_tx)
        .context("Failed to create config watcher")?;
    debouncer
        .watcher()
        .watch(parent, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", parent.display()))?;
    info!("Watching config directory: {}", parent.display());

    for result in debounce_rx {
        match result {
            Ok(events) => {
                let touched = events
                    .iter()
                    .any(|event| event.path.file_name() == file_name.as_deref());
                if !touched {
                    continue;
                }

                debug!("Config file changed, sending reload notification");
                std::thread::sleep(RELOAD_SETTLE_DELAY);
                if tx.send(()).is_err() {
                    debug!("Config reload receiver dropped, stopping watcher");
                    break;
                }
            }
            Err(e) => error!("Watcher error: {e:?}"),
        }
    }

    Ok(())
}
