//! Test module for kindle-core
//!
//! This module contains scenario tests for:
//! - The full search pipeline through `KindleCore`
//! - Cache rebuilds, failures and persistence
//! - History classification and eviction
//! - Matching across query variants and merge determinism
//! - Configuration loading and directory management

mod config_tests;
mod index_tests;
mod search_tests;
