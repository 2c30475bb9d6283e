//! Shared types for Kindle launcher components.
//!
//! This crate provides the data model used by kindle-core and its front ends.
//! All types are serializable so snapshots, history and results can be
//! persisted or handed to a presentation layer as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The three kinds of launchable targets.
///
/// The derived ordering (applications, then directories, then commands) is
/// the order in which per-kind result lists are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Application,
    Directory,
    Command,
}

impl EntryKind {
    /// All kinds in merge order
    pub const ALL: [EntryKind; 3] = [
        EntryKind::Application,
        EntryKind::Directory,
        EntryKind::Command,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Application => "application",
            EntryKind::Directory => "directory",
            EntryKind::Command => "command",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an icon source file on disk.
///
/// The modification marker is part of the identity: when the source file
/// changes, the identity changes and a new raster is produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconRef {
    pub source_path: PathBuf,

    /// Modification time of the source in seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<u64>,
}

impl IconRef {
    #[must_use]
    pub fn new(source_path: impl Into<PathBuf>, modified: Option<u64>) -> Self {
        Self {
            source_path: source_path.into(),
            modified,
        }
    }

    /// Stable identity string used as the icon cache key.
    #[must_use]
    pub fn identity(&self) -> String {
        match self.modified {
            Some(marker) => format!("{}@{marker}", self.source_path.display()),
            None => self.source_path.display().to_string(),
        }
    }
}

/// Kind-specific payload of an indexed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryTarget {
    /// Installed application bundle or desktop entry
    Application {
        /// File-system name when it differs from the localized display name
        #[serde(
            default,
            rename = "alternateName",
            skip_serializing_if = "Option::is_none"
        )]
        alternate_name: Option<String>,
    },

    /// Registered directory or one of its subdirectories
    Directory {
        /// Editor to open the directory with (none means the file manager)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        editor: Option<String>,
    },

    /// User-defined shell alias
    Command {
        command: String,
        #[serde(
            default,
            rename = "workingDirectory",
            skip_serializing_if = "Option::is_none"
        )]
        working_directory: Option<String>,
    },
}

impl EntryTarget {
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryTarget::Application { .. } => EntryKind::Application,
            EntryTarget::Directory { .. } => EntryKind::Directory,
            EntryTarget::Command { .. } => EntryKind::Command,
        }
    }
}

/// One indexable target.
///
/// `stable_id` is the canonical path for applications and directories and the
/// alias for commands. It never changes across rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedEntry {
    pub stable_id: String,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_keyword: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconRef>,

    #[serde(flatten)]
    pub target: EntryTarget,
}

impl IndexedEntry {
    #[must_use]
    pub fn application(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            stable_id: path.into(),
            display_name: name.into(),
            search_keyword: None,
            icon: None,
            target: EntryTarget::Application {
                alternate_name: None,
            },
        }
    }

    #[must_use]
    pub fn directory(
        path: impl Into<String>,
        name: impl Into<String>,
        editor: Option<String>,
    ) -> Self {
        Self {
            stable_id: path.into(),
            display_name: name.into(),
            search_keyword: None,
            icon: None,
            target: EntryTarget::Directory { editor },
        }
    }

    #[must_use]
    pub fn command(
        alias: impl Into<String>,
        command: impl Into<String>,
        working_directory: Option<String>,
    ) -> Self {
        let alias = alias.into();
        Self {
            display_name: alias.clone(),
            stable_id: alias,
            search_keyword: None,
            icon: None,
            target: EntryTarget::Command {
                command: command.into(),
                working_directory,
            },
        }
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.search_keyword = Some(keyword.into());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: IconRef) -> Self {
        self.icon = Some(icon);
        self
    }

    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.target.kind()
    }

    /// Editor associated with a directory entry
    #[must_use]
    pub fn associated_editor(&self) -> Option<&str> {
        match &self.target {
            EntryTarget::Directory { editor } => editor.as_deref(),
            _ => None,
        }
    }

    /// Whether the entry is backed by a path on disk
    #[must_use]
    pub fn is_path_backed(&self) -> bool {
        !matches!(self.target, EntryTarget::Command { .. })
    }

    /// Labels the matcher scores against, display name first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        let alternate = match &self.target {
            EntryTarget::Application { alternate_name } => alternate_name.as_deref(),
            _ => None,
        };
        std::iter::once(self.display_name.as_str())
            .chain(self.search_keyword.as_deref())
            .chain(alternate)
    }
}

/// A completed launch, recorded for history ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEvent {
    /// Raw query the user had typed when launching
    pub keyword: String,
    pub selected_id: String,
    /// Milliseconds since the epoch
    pub timestamp: u64,
}

/// How a candidate relates to past selections.
///
/// Variants are declared in ascending priority so the derived `Ord` can be
/// used directly when ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    None,
    Prefix,
    Exact,
}

/// History classification of a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMatch {
    pub match_type: MatchType,
    pub frequency: u32,
}

impl HistoryMatch {
    #[must_use]
    pub fn exact(frequency: u32) -> Self {
        Self {
            match_type: MatchType::Exact,
            frequency,
        }
    }

    #[must_use]
    pub fn prefix(frequency: u32) -> Self {
        Self {
            match_type: MatchType::Prefix,
            frequency,
        }
    }

    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// A ranked result handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub kind: EntryKind,

    pub display_name: String,

    /// Path for applications and directories, alias for commands
    pub path_or_alias: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,

    /// Shell command line for command entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    /// Cached raster for the entry icon, absent when rendering failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<PathBuf>,

    pub score: i64,

    #[serde(default)]
    pub history: HistoryMatch,
}

impl SearchResult {
    /// Project an entry into a result without icon or history data.
    #[must_use]
    pub fn from_entry(entry: &IndexedEntry, score: i64) -> Self {
        let (command, working_directory) = match &entry.target {
            EntryTarget::Command {
                command,
                working_directory,
            } => (Some(command.clone()), working_directory.clone()),
            _ => (None, None),
        };

        Self {
            kind: entry.kind(),
            display_name: entry.display_name.clone(),
            path_or_alias: entry.stable_id.clone(),
            editor: entry.associated_editor().map(str::to_string),
            command,
            working_directory,
            icon_path: None,
            score,
            history: HistoryMatch::none(),
        }
    }
}
