//! Application discovery: macOS `.app` bundles and freedesktop `.desktop` files.

use crate::error::ScanError;
use crate::utils::modified_secs;
use kindle_types::{EntryTarget, IconRef, IndexedEntry};
use plist::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Walk `root` up to `max_depth` levels and collect every application found.
///
/// A root that does not exist yields nothing. Bundles are not descended into,
/// so helper apps nested inside another bundle are not indexed.
///
/// # Errors
///
/// Returns `ScanError::Unreadable` if the root exists but cannot be listed.
pub fn scan_applications(root: &Path, max_depth: usize) -> Result<Vec<IndexedEntry>, ScanError> {
    if !root.exists() {
        debug!("Application root {} does not exist", root.display());
        return Ok(Vec::new());
    }

    fs::read_dir(root).map_err(|source| ScanError::Unreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let language = preferred_language();
    let bundle_languages = bundle_languages(language.as_deref(), locale_region().as_deref());
    let mut entries = Vec::new();
    let mut walker = WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(item) = walker.next() {
        let item = match item {
            Ok(item) => item,
            Err(e) if e.depth() == 0 => {
                return Err(ScanError::Walk {
                    root: root.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                debug!("Skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };

        let path = item.path();
        let is_dir = item.file_type().is_dir();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("app") if is_dir => {
                if let Some(entry) = parse_app_bundle(path, &bundle_languages) {
                    entries.push(entry);
                }
                walker.skip_current_dir();
            }
            Some("desktop") if !is_dir => {
                if let Some(entry) = parse_desktop_file(path, language.as_deref()) {
                    entries.push(entry);
                }
            }
            _ => {}
        }
    }

    debug!("Found {} applications under {}", entries.len(), root.display());
    Ok(entries)
}

/// Parse a `.app` bundle into an application entry.
///
/// The display name is the localized bundle name when one can be found;
/// the bundle stem is then kept as the alternate name.
fn parse_app_bundle(path: &Path, languages: &[String]) -> Option<IndexedEntry> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }

    let info = read_info_plist(path);
    let display_name = localized_bundle_name(path, info.as_ref(), languages)
        .unwrap_or_else(|| stem.to_string());
    let alternate_name = (display_name != stem).then(|| stem.to_string());

    let mut entry = IndexedEntry::application(path.to_string_lossy(), display_name);
    entry.target = EntryTarget::Application { alternate_name };
    if let Some(icon) = bundle_icon(path, info.as_ref()) {
        entry = entry.with_icon(icon);
    }
    trace!("Indexed bundle {}", path.display());
    Some(entry)
}

fn read_info_plist(bundle: &Path) -> Option<plist::Dictionary> {
    let path = bundle.join("Contents").join("Info.plist");
    if !path.is_file() {
        return None;
    }
    match Value::from_file(&path) {
        Ok(value) => value.into_dictionary(),
        Err(e) => {
            debug!("Unreadable Info.plist {}: {e}", path.display());
            None
        }
    }
}

/// Bundle name from a plist dictionary, preferring `CFBundleDisplayName`.
fn bundle_name_from(dict: &plist::Dictionary) -> Option<String> {
    ["CFBundleDisplayName", "CFBundleName"]
        .iter()
        .filter_map(|key| dict.get(*key).and_then(Value::as_string))
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(ToString::to_string)
}

/// Localized name lookup: Spotlight metadata, then `<lang>.lproj/InfoPlist.strings`
/// for each candidate language, then the names in `Info.plist`.
fn localized_bundle_name(
    bundle: &Path,
    info: Option<&plist::Dictionary>,
    languages: &[String],
) -> Option<String> {
    if let Some(name) = spotlight_display_name(bundle) {
        return Some(name);
    }

    let resources = bundle.join("Contents").join("Resources");
    for lang in languages {
        let strings = resources
            .join(format!("{lang}.lproj"))
            .join("InfoPlist.strings");
        if let Some(name) = read_strings_name(&strings) {
            return Some(name);
        }
    }

    info.and_then(bundle_name_from)
}

#[cfg(all(target_os = "macos", not(test)))]
fn spotlight_display_name(bundle: &Path) -> Option<String> {
    let output = std::process::Command::new("mdls")
        .args(["-name", "kMDItemDisplayName", "-raw"])
        .arg(bundle)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let raw = raw.trim();
    let name = raw.strip_suffix(".app").unwrap_or(raw).to_string();
    (!name.is_empty() && name != "(null)").then_some(name)
}

#[cfg(not(all(target_os = "macos", not(test))))]
#[allow(clippy::unnecessary_wraps)] // Same signature as the mdls lookup
fn spotlight_display_name(_bundle: &Path) -> Option<String> {
    None
}

/// Read a bundle name from an `InfoPlist.strings` file.
///
/// Compiled bundles ship these as binary or XML plists; source bundles use
/// the `"key" = "value";` text form.
fn read_strings_name(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    if let Some(name) = Value::from_file(path)
        .ok()
        .and_then(Value::into_dictionary)
        .and_then(|dict| bundle_name_from(&dict))
    {
        return Some(name);
    }

    let text = fs::read_to_string(path).ok()?;
    let pairs: Vec<(&str, &str)> = text.lines().filter_map(parse_strings_line).collect();
    ["CFBundleDisplayName", "CFBundleName"]
        .iter()
        .find_map(|key| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| *v))
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
}

/// `"CFBundleName" = "ターミナル";` -> `("CFBundleName", "ターミナル")`
fn parse_strings_line(line: &str) -> Option<(&str, &str)> {
    fn unquote(s: &str) -> Option<&str> {
        s.trim().strip_prefix('"')?.strip_suffix('"')
    }

    let (key, value) = line.trim().strip_suffix(';')?.split_once('=')?;
    Some((unquote(key)?, unquote(value)?))
}

/// Icon named by `CFBundleIconFile` (default `AppIcon`), with or without the
/// `.icns` extension, otherwise the first `.icns` in the resources folder.
fn bundle_icon(bundle: &Path, info: Option<&plist::Dictionary>) -> Option<IconRef> {
    let resources = bundle.join("Contents").join("Resources");
    let icon_file = info
        .and_then(|dict| dict.get("CFBundleIconFile"))
        .and_then(Value::as_string)
        .filter(|name| !name.is_empty())
        .unwrap_or("AppIcon");

    let named = [resources.join(format!("{icon_file}.icns")), resources.join(icon_file)]
        .into_iter()
        .find(|p| p.is_file());
    let source = match named {
        Some(path) => path,
        None => {
            let mut candidates: Vec<PathBuf> = fs::read_dir(&resources)
                .ok()?
                .filter_map(std::result::Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "icns"))
                .collect();
            candidates.sort();
            candidates.into_iter().next()?
        }
    };

    let modified = modified_secs(&source);
    Some(IconRef::new(source, modified))
}

/// Parse a `.desktop` file into an application entry.
///
/// Entries marked `NoDisplay` or `Hidden`, and anything that is not of type
/// `Application`, are skipped. When a `Name[lang]` key matches the user's
/// language it becomes the display name and the plain `Name` is kept as the
/// alternate name.
fn parse_desktop_file(path: &Path, language: Option<&str>) -> Option<IndexedEntry> {
    let content = fs::read_to_string(path).ok()?;

    let mut in_section = false;
    let mut name = None;
    let mut localized = None;
    let mut icon = None;
    let mut kind = None;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_section = line == "[Desktop Entry]";
            continue;
        }
        if !in_section || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            "Name" => name = Some(value.to_string()),
            "Icon" => icon = Some(value.to_string()),
            "Type" => kind = Some(value.to_string()),
            "NoDisplay" | "Hidden" if value.eq_ignore_ascii_case("true") => return None,
            _ => {
                if let Some(lang) = language
                    && key.strip_prefix("Name[").and_then(|k| k.strip_suffix(']')) == Some(lang)
                {
                    localized = Some(value.to_string());
                }
            }
        }
    }

    if kind.as_deref().is_some_and(|k| k != "Application") {
        return None;
    }

    let name = name.filter(|n| !n.is_empty())?;
    let (display_name, alternate_name) = match localized {
        Some(local) if local != name => (local, Some(name)),
        _ => (name, None),
    };

    let mut entry = IndexedEntry::application(path.to_string_lossy(), display_name);
    entry.target = EntryTarget::Application { alternate_name };

    // Theme icon names cannot be resolved without an icon theme lookup
    if let Some(icon) = icon.map(PathBuf::from).filter(|p| p.is_absolute() && p.is_file()) {
        let modified = modified_secs(&icon);
        entry = entry.with_icon(IconRef::new(icon, modified));
    }

    Some(entry)
}

/// Primary language from `LC_ALL`/`LC_MESSAGES`/`LANG`, e.g. `ja` for `ja_JP.UTF-8`.
fn preferred_language() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty())
        .and_then(|v| language_from_locale(&v))
}

fn language_from_locale(locale: &str) -> Option<String> {
    let lang = locale
        .split(['_', '.', '@'])
        .next()
        .filter(|l| !l.is_empty() && *l != "C" && *l != "POSIX")?;
    Some(lang.to_string())
}

/// Region-qualified locale from `LANG`, e.g. `ja-JP` for `ja_JP.UTF-8`.
fn locale_region() -> Option<String> {
    let lang = std::env::var("LANG").ok()?;
    let code = lang.split(['.', '@']).next().filter(|c| c.contains('_'))?;
    Some(code.replace('_', "-"))
}

/// `.lproj` directories to try, in order. Japanese names are preferred over
/// English ones after the user's own language, then `Base`.
fn bundle_languages(language: Option<&str>, region: Option<&str>) -> Vec<String> {
    let mut langs: Vec<String> = Vec::new();
    let candidates = [language, region, Some("Japanese"), Some("ja"), Some("en"), Some("Base")];
    for lang in candidates.into_iter().flatten() {
        if !langs.iter().any(|l| l == lang) {
            langs.push(lang.to_string());
        }
    }
    langs
}
