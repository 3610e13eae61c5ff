//! Configuration loading
//!
//! Hierarchical configuration merging via figment: programmatic defaults,
//! project YAML files, then STRRAY_-prefixed environment variables.

mod loader;

pub use loader::{ConfigError, ConfigLoader};
