//! Configuration loading for logsieve
//!
//! This crate provides the property set used to describe a filter, the
//! parsers for `.properties` and TOML config files, and the provider that
//! watches a config file for changes.

mod error;
mod properties;
mod provider;
mod resolve;

pub use error::ConfigError;
pub use properties::Properties;
pub use provider::{ConfigFormat, ConfigProvider, FileConfigProvider};
pub use resolve::{conf_path, filter_config, lookup};

// Re-export types used in our public API
pub use logsieve_types::{FilterConfig, OptionKey, ReloadMode, WaitPolicy};
