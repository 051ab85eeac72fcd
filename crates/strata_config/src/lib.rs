//! Parsing and validation of `strata.toml` configuration files.
//!
//! This crate reads the compiler configuration that governs how compiled
//! units are acknowledged: which flags are acceptable, whether dependency
//! digests are cross-checked, which probes warn, and where descriptor files
//! are searched for.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
