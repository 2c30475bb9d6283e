//! Kindle launcher CLI
//!
//! Terminal front end for kindle-core. Provides:
//! - Default: interactive prompt with debounced search
//! - One-shot search, refresh and history commands
//! - Settings management for registered directories and command aliases
//! - A watch mode that rebuilds on config changes and on schedule

mod config_watcher;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use kindle_core::config::{CustomCommand, Directories, OpenMode, RegisteredDirectory};
use kindle_core::session::SearchOutcome;
use kindle_core::{KindleCore, MatchType, SearchResult};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::sync::{Arc, mpsc as std_mpsc};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config_watcher::spawn_config_watcher;

/// How often watch mode checks whether the cache is due for a rebuild
const UPDATE_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

const PROMPT: &str = "kindle> ";

/// Kindle launcher CLI
#[derive(Parser)]
#[command(name = "kindle")]
#[command(about = "Kindle launcher - find applications, folders and command aliases")]
#[command(version)]
#[command(after_help = "\
Examples:
  kindle                          Interactive search prompt
  kindle search saf               Print ranked results for 'saf'
  kindle select saf /Applications/Safari.app
                                  Record a launch so 'saf' ranks Safari first
  kindle dirs add ~/Projects --subdirs editor --editor code
  kindle aliases add gs 'git status' --cwd ~/src/kindle
  kindle watch                    Rebuild on config change and every few hours
")]
struct Cli {
    /// Keep config, cache and history in this directory instead of the
    /// platform defaults
    #[arg(long, value_name = "DIR", global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive prompt with debounced search (the default)
    Interactive,

    /// Search once and print ranked results
    Search {
        /// Query words, joined with spaces
        query: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rescan everything and replace the cache
    Refresh,

    /// Record that `id` was launched while `keyword` was typed
    Select {
        keyword: String,
        /// Path of the application or directory, or the command alias
        id: String,
    },

    /// Show the selection history
    History {
        /// Remove all recorded selections
        #[arg(long)]
        clear: bool,
    },

    /// Show cache statistics
    Stats,

    /// Print the files and directories kindle uses
    Paths,

    /// Registered directory management
    Dirs {
        #[command(subcommand)]
        command: DirsCommand,
    },

    /// Custom command alias management
    Aliases {
        #[command(subcommand)]
        command: AliasesCommand,
    },

    /// Remove every cached icon raster
    #[command(name = "clear-icons")]
    ClearIcons,

    /// Keep running, rebuilding on config changes and on schedule
    Watch,
}

#[derive(Subcommand)]
enum DirsCommand {
    /// List registered directories
    List,

    /// Register a directory, replacing any existing entry for the same path
    Add {
        path: PathBuf,

        /// How the directory itself is opened
        #[arg(long, value_enum, default_value_t = ModeArg::Finder)]
        parent: ModeArg,

        /// How its immediate subdirectories are opened
        #[arg(long, value_enum, default_value_t = ModeArg::None)]
        subdirs: ModeArg,

        /// Editor used in `editor` mode
        #[arg(long)]
        editor: Option<String>,

        /// Search keyword that replaces the folder name
        #[arg(long)]
        keyword: Option<String>,

        /// Also index applications found inside the directory
        #[arg(long)]
        scan_apps: bool,
    },

    /// Unregister a directory
    Remove { path: PathBuf },
}

#[derive(Subcommand)]
enum AliasesCommand {
    /// List command aliases
    List,

    /// Add or replace a command alias
    Add {
        alias: String,
        /// Shell command line to run
        command: String,
        /// Working directory for the command
        #[arg(long)]
        cwd: Option<String>,
    },

    /// Remove a command alias
    Remove { alias: String },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    None,
    Finder,
    Editor,
}

impl From<ModeArg> for OpenMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::None => OpenMode::None,
            ModeArg::Finder => OpenMode::Finder,
            ModeArg::Editor => OpenMode::Editor,
        }
    }
}

/// Set up logging with file output for debugging.
/// In debug builds, defaults to debug level and logs to a timestamped file.
/// In release builds, defaults to info level and logs to stderr.
fn setup_logging() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kindle={default_level}")));

    if cfg!(debug_assertions) {
        let temp_dir = std::env::temp_dir();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("kindle-{timestamp}.log");

        let file_appender = tracing_appender::rolling::never(&temp_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .with(filter)
            .init();

        eprintln!("Logging to: {} (and stderr)", temp_dir.join(&log_filename).display());
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging();

    let dirs = match cli.state_dir {
        Some(base) => Directories::with_base(base),
        None => Directories::new().context("Failed to determine kindle directories")?,
    };
    let core = Arc::new(KindleCore::open(dirs).context("Failed to open kindle state")?);

    match cli.command {
        None | Some(Commands::Interactive) => run_interactive(core).await,
        Some(Commands::Search { query, json }) => run_search(&core, &query.join(" "), json),
        Some(Commands::Refresh) => run_refresh(&core),
        Some(Commands::Select { keyword, id }) => run_select(&core, &keyword, &id),
        Some(Commands::History { clear }) => run_history(&core, clear),
        Some(Commands::Stats) => {
            print_stats(&core);
            Ok(())
        }
        Some(Commands::Paths) => {
            print_paths(core.dirs());
            Ok(())
        }
        Some(Commands::Dirs { command }) => run_dirs_command(&core, command),
        Some(Commands::Aliases { command }) => run_aliases_command(&core, command),
        Some(Commands::ClearIcons) => {
            let removed = core.clear_icon_cache().context("Failed to clear icon cache")?;
            println!("Removed {removed} cached icons");
            Ok(())
        }
        Some(Commands::Watch) => run_watch(core).await,
    }
}

/// Build the cache once if it has never been built.
fn ensure_built(core: &KindleCore) -> Result<()> {
    if core.stats().built_at == 0 {
        eprintln!("Building cache...");
        core.refresh().context("Failed to build cache")?;
    }
    Ok(())
}

/// Run a core operation on the blocking pool.
async fn on_core<T, F>(core: &Arc<KindleCore>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&KindleCore) -> kindle_core::Result<T> + Send + 'static,
{
    let core = Arc::clone(core);
    let result = tokio::task::spawn_blocking(move || f(&core))
        .await
        .context("Background task failed")?;
    Ok(result?)
}

fn run_search(core: &KindleCore, query: &str, json: bool) -> Result<()> {
    ensure_built(core)?;
    let results = core.search(query);

    if json {
        let out = serde_json::to_string_pretty(&results).context("Failed to encode results")?;
        println!("{out}");
    } else {
        print_results(&results);
    }
    Ok(())
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }

    for (i, result) in results.iter().enumerate() {
        let marker = match result.history.match_type {
            MatchType::Exact => '*',
            MatchType::Prefix => '+',
            MatchType::None => ' ',
        };
        println!(
            "{:>3}{marker} {:<11} {}  ({})",
            i + 1,
            result.kind.as_str(),
            result.display_name,
            result.path_or_alias
        );
    }
}

fn run_refresh(core: &KindleCore) -> Result<()> {
    let count = core.refresh().context("Rebuild failed, previous cache kept")?;
    println!("Indexed {count} entries");
    Ok(())
}

fn run_select(core: &KindleCore, keyword: &str, id: &str) -> Result<()> {
    ensure_built(core)?;
    if !core.search(keyword).iter().any(|r| r.path_or_alias == id) {
        warn!("'{id}' is not among the results for '{keyword}'");
    }
    core.record_selection(keyword, id)
        .context("Failed to save history")?;
    println!("Recorded '{keyword}' -> {id}");
    Ok(())
}

fn run_history(core: &KindleCore, clear: bool) -> Result<()> {
    if clear {
        core.clear_history().context("Failed to clear history")?;
        println!("History cleared");
        return Ok(());
    }

    let events = core.history_events();
    if events.is_empty() {
        println!("No history.");
        return Ok(());
    }

    for event in events.iter().rev() {
        println!(
            "{}  {:<16} {}",
            format_millis(event.timestamp),
            event.keyword,
            event.selected_id
        );
    }
    Ok(())
}

fn format_millis(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map_or_else(
            || "never".to_string(),
            |t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            },
        )
}

fn print_stats(core: &KindleCore) {
    let stats = core.stats();
    println!("Applications: {}", stats.applications);
    println!("Directories:  {}", stats.directories);
    println!("Commands:     {}", stats.commands);
    println!("History:      {}", stats.history_events);
    if stats.built_at == 0 {
        println!("Built:        never");
    } else {
        println!("Built:        {}", format_millis(stats.built_at));
    }
    println!(
        "Stale:        {}",
        if core.needs_refresh() { "yes" } else { "no" }
    );
}

fn print_paths(dirs: &Directories) {
    println!("Config:  {}", dirs.config_file.display());
    println!("Cache:   {}", dirs.index_cache.display());
    println!("History: {}", dirs.history_file.display());
    println!("Icons:   {}", dirs.icon_cache.display());
}

fn run_dirs_command(core: &KindleCore, command: DirsCommand) -> Result<()> {
    match command {
        DirsCommand::List => {
            let config = core.config();
            if config.registered_directories.is_empty() {
                println!("No registered directories.");
            }
            for dir in &config.registered_directories {
                println!(
                    "{}  parent={:?} subdirs={:?}{}",
                    dir.path,
                    dir.parent_open_mode,
                    dir.subdirs_open_mode,
                    if dir.scan_for_apps { " apps" } else { "" }
                );
            }
            Ok(())
        }
        DirsCommand::Add {
            path,
            parent,
            subdirs,
            editor,
            keyword,
            scan_apps,
        } => {
            let path = std::fs::canonicalize(&path)
                .with_context(|| format!("Cannot register {}", path.display()))?;
            if !path.is_dir() {
                bail!("{} is not a directory", path.display());
            }

            let mut dir = RegisteredDirectory::new(path.to_string_lossy());
            dir.parent_open_mode = parent.into();
            dir.subdirs_open_mode = subdirs.into();
            dir.parent_editor.clone_from(&editor);
            dir.subdirs_editor = editor;
            dir.parent_search_keyword = keyword;
            dir.scan_for_apps = scan_apps;

            let count = core
                .upsert_directory(dir)
                .context("Failed to register directory")?;
            println!("Registered {} ({count} entries indexed)", path.display());
            Ok(())
        }
        DirsCommand::Remove { path } => {
            let key = std::fs::canonicalize(&path).unwrap_or(path);
            if core
                .remove_directory(&key.to_string_lossy())
                .context("Failed to remove directory")?
            {
                println!("Removed {}", key.display());
            } else {
                println!("{} was not registered", key.display());
            }
            Ok(())
        }
    }
}

fn run_aliases_command(core: &KindleCore, command: AliasesCommand) -> Result<()> {
    match command {
        AliasesCommand::List => {
            let config = core.config();
            if config.custom_commands.is_empty() {
                println!("No command aliases.");
            }
            for cmd in &config.custom_commands {
                match &cmd.working_directory {
                    Some(cwd) => println!("{:<16} {}  (in {cwd})", cmd.alias, cmd.command),
                    None => println!("{:<16} {}", cmd.alias, cmd.command),
                }
            }
            Ok(())
        }
        AliasesCommand::Add {
            alias,
            command,
            cwd,
        } => {
            let alias = alias.trim().to_string();
            if alias.is_empty() {
                bail!("Alias must not be empty");
            }
            core.upsert_command(CustomCommand {
                alias: alias.clone(),
                command,
                working_directory: cwd,
            })
            .context("Failed to save alias")?;
            println!("Saved alias '{alias}'");
            Ok(())
        }
        AliasesCommand::Remove { alias } => {
            if core
                .remove_command(&alias)
                .context("Failed to remove alias")?
            {
                println!("Removed alias '{alias}'");
            } else {
                println!("No alias named '{alias}'");
            }
            Ok(())
        }
    }
}

/// Read lines on a dedicated thread. The next prompt is shown only after
/// the async side acknowledges the previous line.
fn spawn_prompt(
    lines: mpsc::UnboundedSender<String>,
    ready: std_mpsc::Receiver<()>,
) -> std::thread::JoinHandle<Result<()>> {
    std::thread::spawn(move || {
        let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if lines.send(line).is_err() || ready.recv().is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => return Err(e).context("Failed to read input"),
            }
        }
        Ok(())
    })
}

/// Wait until an outcome at least as new as `generation` is published.
async fn wait_for(
    rx: &mut watch::Receiver<SearchOutcome>,
    generation: u64,
) -> Result<SearchOutcome> {
    loop {
        {
            let outcome = rx.borrow_and_update();
            if outcome.generation >= generation {
                return Ok(outcome.clone());
            }
        }
        rx.changed().await.context("Search session closed")?;
    }
}

async fn run_interactive(core: Arc<KindleCore>) -> Result<()> {
    if on_core(&core, KindleCore::refresh_on_startup).await? {
        info!("Cache rebuilt on startup");
    }

    let session = core.session();
    let mut rx = session.subscribe();

    let (lines_tx, mut lines_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = std_mpsc::channel();
    let prompt = spawn_prompt(lines_tx, ready_rx);

    println!("Type to search. ':N' records a launch of result N, ':refresh' rebuilds, ':q' quits.");

    let mut last = SearchOutcome::default();
    while let Some(line) = lines_rx.recv().await {
        if let Some(command) = line.trim().strip_prefix(':') {
            match command {
                "q" | "quit" => break,
                "refresh" => match on_core(&core, KindleCore::refresh).await {
                    Ok(count) => println!("Indexed {count} entries"),
                    Err(e) => eprintln!("Rebuild failed, previous cache kept: {e:#}"),
                },
                other => match other.parse::<usize>() {
                    Ok(n) if n >= 1 && n <= last.results.len() => {
                        let chosen = &last.results[n - 1];
                        core.record_selection(&last.query, &chosen.path_or_alias)
                            .context("Failed to save history")?;
                        println!("Launched {} ({})", chosen.display_name, chosen.path_or_alias);
                    }
                    _ => eprintln!("Unknown command ':{other}'"),
                },
            }
        } else {
            let generation = session.query_changed(&line);
            last = wait_for(&mut rx, generation).await?;
            if !last.query.trim().is_empty() {
                print_results(&last.results);
            }
        }

        if ready_tx.send(()).is_err() {
            break;
        }
    }

    session.cancel();
    drop(ready_tx);
    match prompt.join() {
        Ok(result) => result,
        Err(_) => bail!("Prompt thread panicked"),
    }
}

async fn run_watch(core: Arc<KindleCore>) -> Result<()> {
    if on_core(&core, KindleCore::refresh_on_startup).await? {
        info!("Cache rebuilt on startup");
    }

    let (reload_tx, mut reload_rx) = mpsc::unbounded_channel();
    let _watcher = spawn_config_watcher(core.dirs().config_file.clone(), reload_tx);

    let mut ticker = tokio::time::interval(UPDATE_CHECK_INTERVAL);
    ticker.tick().await;

    info!("Watching for changes (Ctrl-C to stop)");
    loop {
        tokio::select! {
            Some(()) = reload_rx.recv() => {
                match on_core(&core, KindleCore::reload_config).await {
                    Ok(count) => info!("Config applied, {count} entries indexed"),
                    Err(e) => warn!("Config reload failed: {e:#}"),
                }
            }
            _ = ticker.tick() => {
                let due = {
                    let enabled = core.config().cache_update.auto_update_enabled;
                    enabled && core.needs_refresh()
                };
                if due {
                    match on_core(&core, KindleCore::refresh).await {
                        Ok(count) => info!("Scheduled rebuild indexed {count} entries"),
                        Err(e) => warn!("Scheduled rebuild failed: {e:#}"),
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    info!("Stopped watching");
    Ok(())
}
