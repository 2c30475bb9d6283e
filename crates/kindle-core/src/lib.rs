pub mod config;
pub mod focus;
pub mod history;
pub mod index;
pub mod query;
pub mod scanner;
pub mod session;

// Exposed for benchmarks - not part of stable API
#[doc(hidden)]
pub mod search;

mod engine;
mod error;
pub(crate) mod utils;

#[cfg(test)]
mod tests;

pub use engine::{IndexStats, KindleCore};
pub use error::{Error, Result, ScanError};

pub use kindle_types::*;
