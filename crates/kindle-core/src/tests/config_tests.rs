//! Tests for config loading, defaults and reload behavior

use crate::Result;
use crate::config::{Config, OpenMode, TerminalType};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_reload_config_updates_values() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");

    fs::write(&config_path, r#"{"search": {"maxDisplayedResults": 10}}"#).unwrap();
    let config1 = Config::load(&config_path)?;
    assert_eq!(config1.search.max_displayed_results, 10);

    fs::write(&config_path, r#"{"search": {"maxDisplayedResults": 20}}"#).unwrap();
    let config2 = Config::load(&config_path)?;
    assert_eq!(config2.search.max_displayed_results, 20);

    Ok(())
}

#[test]
fn test_partial_config_keeps_defaults() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    fs::write(&config_path, r#"{"search": {"debounceMs": 80}}"#).unwrap();

    let config = Config::load(&config_path)?;
    assert_eq!(config.search.debounce_ms, 80);
    assert_eq!(config.search.max_results_per_kind, 20);
    assert_eq!(config.search.max_displayed_results, 50);
    assert_eq!(config.search.history_limit, 50);
    assert!(config.cache_update.update_on_startup);
    assert_eq!(config.cache_update.auto_update_interval_hours, 6);
    assert_eq!(config.default_terminal, TerminalType::default());

    Ok(())
}

#[test]
fn test_registered_directory_from_json() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{
            "registeredDirectories": [{
                "path": "~/Projects",
                "parentOpenMode": "finder",
                "parentSearchKeyword": "proj",
                "subdirsOpenMode": "editor",
                "subdirsEditor": "cursor",
                "scanForApps": true
            }],
            "defaultEditor": "code"
        }"#,
    )
    .unwrap();

    let config = Config::load(&config_path)?;
    let dir = &config.registered_directories[0];
    assert_eq!(dir.path, "~/Projects");
    assert_eq!(dir.parent_open_mode, OpenMode::Finder);
    assert_eq!(dir.parent_search_keyword.as_deref(), Some("proj"));
    assert_eq!(dir.subdirs_open_mode, OpenMode::Editor);
    assert_eq!(dir.subdirs_editor.as_deref(), Some("cursor"));
    assert!(dir.scan_for_apps);
    assert_eq!(config.default_editor.as_deref(), Some("code"));

    Ok(())
}

#[test]
fn test_unknown_fields_do_not_fail_load() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{"search": {"debounceMs": 90, "fuzzyness": 3}, "theme": "dark"}"#,
    )
    .unwrap();

    let config = Config::load(&config_path)?;
    assert_eq!(config.search.debounce_ms, 90);

    Ok(())
}
