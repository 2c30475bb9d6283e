use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds.
// u128 millis fits in u64 for realistic timestamps (until year 584942417)
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Modification time of a file in whole seconds, if available.
pub(crate) fn modified_secs(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

/// Write a file by writing a sibling temp file and renaming it over the target.
///
/// Readers of `path` see either the old or the new content, never a partial write.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)
}
