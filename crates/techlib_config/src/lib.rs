//! Parsing and validation of `techlib.toml` characterization settings.
//!
//! This crate reads the run configuration and produces a strongly-typed
//! [`TechConfig`]: clock constraint, worker count, device parameters, backend
//! selection, default widths and the correction-heuristic constants.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_path, load_config_from_str, CONFIG_FILE};
pub use types::*;
