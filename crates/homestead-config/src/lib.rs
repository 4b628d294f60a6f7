#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Host configuration for the Homestead module host.
//!
//! A configuration file lists the modules to load, in order, together with
//! each module's raw configuration block, plus the dispatch policy and the
//! logging setup.
//!
//! # Usage
//!
//! ```rust,no_run
//! use homestead_config::HostConfig;
//!
//! let config = HostConfig::load_file(std::path::Path::new("homestead.toml")).unwrap();
//! for entry in &config.modules {
//!     println!("loading {}", entry.module);
//! }
//! ```
//!
//! # Design
//!
//! This crate has **no dependencies on other internal homestead crates**.
//! Module configuration blocks stay untyped here; each module turns its own
//! block into a typed value when it is instantiated.

/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl HostConfig {
    /// Load configuration from a TOML or YAML file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text is malformed or fails validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::parse(content, loader::FileFormat::Toml, "<inline>")
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text is malformed or fails validation.
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        loader::parse(content, loader::FileFormat::Yaml, "<inline>")
    }
}
