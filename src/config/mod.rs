//! Configuration loading and management.
//!
//! - [`types`]: config structs and TOML loading
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks

mod defaults;
mod types;
mod validation;

pub use types::{
    BridgeConfig, Config, ConfigError, ExtensionsConfig, IrcConfig, QueueConfig, TimeoutsConfig,
};
pub use validation::{ValidationError, validate};
