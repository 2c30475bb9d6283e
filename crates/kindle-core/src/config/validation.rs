//! Config validation - warns about unknown fields

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Validate JSON config and warn about unknown fields.
pub fn warn_unknown_fields(content: &str, config_name: &str) {
    let Ok(value) = serde_json::from_str::<Value>(content) else {
        return;
    };

    let expected = expected_config_keys();
    let unknowns = find_unknown_keys(&value, &expected, "");

    for path in unknowns {
        warn!("Unknown config field in {config_name}: {path}");
    }
}

/// Find unknown keys in JSON value compared to expected keys.
/// Returns paths like "search.unknownField" or "customCommands[1].typo".
fn find_unknown_keys(value: &Value, expected: &ExpectedKeys, prefix: &str) -> Vec<String> {
    let mut unknowns = Vec::new();

    let Value::Object(obj) = value else {
        return unknowns;
    };

    for (key, child) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        if let Some(nested) = expected.nested.get(key.as_str()) {
            unknowns.extend(find_unknown_keys(child, nested, &path));
        } else if let Some(item_keys) = expected.arrays.get(key.as_str()) {
            if let Value::Array(items) = child {
                for (i, item) in items.iter().enumerate() {
                    unknowns.extend(find_unknown_keys(item, item_keys, &format!("{path}[{i}]")));
                }
            }
        } else if !expected.fields.contains(key.as_str()) {
            unknowns.push(path);
        }
    }

    unknowns
}

/// Expected keys for a config section.
/// `fields` are leaf fields, `nested` are nested objects and `arrays` are
/// arrays of objects, each with their own expected keys.
struct ExpectedKeys {
    fields: HashSet<&'static str>,
    nested: HashMap<&'static str, ExpectedKeys>,
    arrays: HashMap<&'static str, ExpectedKeys>,
}

impl ExpectedKeys {
    fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.iter().copied().collect(),
            nested: HashMap::new(),
            arrays: HashMap::new(),
        }
    }

    fn with_nested(mut self, key: &'static str, nested: ExpectedKeys) -> Self {
        self.nested.insert(key, nested);
        self
    }

    fn with_array(mut self, key: &'static str, items: ExpectedKeys) -> Self {
        self.arrays.insert(key, items);
        self
    }
}

/// Expected keys for `Config` (settings.rs)
fn expected_config_keys() -> ExpectedKeys {
    let search_keys = ExpectedKeys::new(&[
        "debounceMs",
        "maxResultsPerKind",
        "maxDisplayedResults",
        "historyLimit",
    ]);

    let apps_keys =
        ExpectedKeys::new(&[]).with_array("roots", ExpectedKeys::new(&["path", "maxDepth"]));

    let directory_keys = ExpectedKeys::new(&[
        "path",
        "parentOpenMode",
        "parentEditor",
        "parentSearchKeyword",
        "subdirsOpenMode",
        "subdirsEditor",
        "scanForApps",
    ]);

    let command_keys = ExpectedKeys::new(&["alias", "command", "workingDirectory"]);

    let cache_update_keys = ExpectedKeys::new(&[
        "updateOnStartup",
        "autoUpdateEnabled",
        "autoUpdateIntervalHours",
    ]);

    ExpectedKeys::new(&["defaultTerminal", "defaultEditor"])
        .with_nested("search", search_keys)
        .with_nested("apps", apps_keys)
        .with_nested("cacheUpdate", cache_update_keys)
        .with_array("registeredDirectories", directory_keys)
        .with_array("customCommands", command_keys)
}
