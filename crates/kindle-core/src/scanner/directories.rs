use crate::config::{OpenMode, RegisteredDirectory};
use crate::error::ScanError;
use kindle_types::IndexedEntry;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Entries contributed by one registered directory.
///
/// The directory itself is indexed unless its parent mode is `None`, and its
/// visible immediate subdirectories are indexed unless the subdirectory mode
/// is `None`. Editors are only attached in `Editor` mode, falling back to
/// `default_editor` when the directory names none.
///
/// # Errors
///
/// Returns `ScanError::Unreadable` if subdirectories are wanted but the
/// directory cannot be listed.
pub fn scan_registered_directory(
    path: &Path,
    dir: &RegisteredDirectory,
    default_editor: Option<&str>,
) -> Result<Vec<IndexedEntry>, ScanError> {
    let mut entries = Vec::new();

    if dir.parent_open_mode != OpenMode::None {
        let editor = editor_for(dir.parent_open_mode, dir.parent_editor.as_deref(), default_editor);
        let keyword = dir
            .parent_search_keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        // A keyword replaces the folder name
        let entry = match keyword {
            Some(keyword) => IndexedEntry::directory(path.to_string_lossy(), keyword, editor)
                .with_keyword(keyword),
            None => IndexedEntry::directory(path.to_string_lossy(), folder_name(path), editor),
        };
        entries.push(entry);
    }

    if dir.subdirs_open_mode != OpenMode::None {
        let editor = editor_for(dir.subdirs_open_mode, dir.subdirs_editor.as_deref(), default_editor);
        let listing = fs::read_dir(path).map_err(|source| ScanError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let mut subdirs: Vec<_> = listing
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .map(|e| e.path())
            .filter(|p| !is_hidden(p))
            .collect();
        subdirs.sort();

        debug!("{} subdirectories under {}", subdirs.len(), path.display());
        entries.extend(subdirs.iter().map(|sub| {
            IndexedEntry::directory(sub.to_string_lossy(), folder_name(sub), editor.clone())
        }));
    }

    Ok(entries)
}

fn editor_for(mode: OpenMode, own: Option<&str>, fallback: Option<&str>) -> Option<String> {
    match mode {
        OpenMode::Editor => own.or(fallback).map(str::to_string),
        OpenMode::Finder | OpenMode::None => None,
    }
}

fn folder_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().to_string(),
        |n| n.to_string_lossy().to_string(),
    )
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn projects() -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("Projects");
        fs::create_dir_all(root.join("beta")).unwrap();
        fs::create_dir_all(root.join("alpha")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("notes.txt"), "x").unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_parent_only_in_finder_mode() {
        let (_tmp, root) = projects();
        let dir = RegisteredDirectory::new(root.to_string_lossy());

        let entries = scan_registered_directory(&root, &dir, Some("vim")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_name, "Projects");
        assert_eq!(entries[0].associated_editor(), None);
        assert_eq!(entries[0].search_keyword, None);
    }

    #[test]
    fn test_parent_keyword_and_editor() {
        let (_tmp, root) = projects();
        let mut dir = RegisteredDirectory::new(root.to_string_lossy());
        dir.parent_open_mode = OpenMode::Editor;
        dir.parent_editor = Some("cursor".into());
        dir.parent_search_keyword = Some("proj".into());

        let entries = scan_registered_directory(&root, &dir, Some("vim")).unwrap();
        assert_eq!(entries[0].associated_editor(), Some("cursor"));
        assert_eq!(entries[0].display_name, "proj");
        assert_eq!(entries[0].search_keyword.as_deref(), Some("proj"));
    }

    #[test]
    fn test_subdirs_sorted_visible_only() {
        let (_tmp, root) = projects();
        let mut dir = RegisteredDirectory::new(root.to_string_lossy());
        dir.parent_open_mode = OpenMode::None;
        dir.subdirs_open_mode = OpenMode::Editor;

        let entries = scan_registered_directory(&root, &dir, Some("vim")).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(entries.iter().all(|e| e.associated_editor() == Some("vim")));
    }

    #[test]
    fn test_nothing_when_both_modes_none() {
        let (_tmp, root) = projects();
        let mut dir = RegisteredDirectory::new(root.to_string_lossy());
        dir.parent_open_mode = OpenMode::None;

        assert!(scan_registered_directory(&root, &dir, None).unwrap().is_empty());
    }

    #[test]
    fn test_unlistable_directory_is_error_when_subdirs_wanted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("file");
        fs::write(&file, "x").unwrap();
        let mut dir = RegisteredDirectory::new(file.to_string_lossy());
        dir.subdirs_open_mode = OpenMode::Finder;

        let err = scan_registered_directory(&file, &dir, None).unwrap_err();
        assert!(matches!(err, ScanError::Unreadable { .. }));
    }

    #[test]
    fn test_editor_for_modes() {
        assert_eq!(editor_for(OpenMode::Finder, Some("code"), None), None);
        assert_eq!(
            editor_for(OpenMode::Editor, None, Some("vim")).as_deref(),
            Some("vim")
        );
        assert_eq!(editor_for(OpenMode::Editor, None, None), None);
    }
}
