//! Parsing and validation of `sitewise.toml` placer configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`SitewiseConfig`] with defaults for every section, validation of the
//! numeric limits, and named profile overlays.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use resolve::resolve_profile;
pub use types::*;
