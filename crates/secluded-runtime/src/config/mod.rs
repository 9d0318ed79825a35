//! Configuration module for the bridge runtime.
//!
//! Loads the adapter and logging settings from files and environment
//! variables, and validates them before the supervisor starts.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{AppConfig, LogFormat, LogLevel, LogOutput, LoggingConfig};
pub use validation::validate_config;
