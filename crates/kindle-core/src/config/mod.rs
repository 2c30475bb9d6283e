mod dirs;
mod settings;
mod validation;

pub use dirs::{Directories, expand_home};
pub use settings::{
    AppConfig, AppRoot, CacheUpdateSettings, Config, CustomCommand, OpenMode,
    RegisteredDirectory, SearchConfig, TerminalType,
};
pub use validation::warn_unknown_fields;
