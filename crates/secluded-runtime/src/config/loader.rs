//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables `secluded.toml`
//! - `yaml-config` *(default)*: enables `secluded.yaml` / `secluded.yml`
//!
//! Both formats are searched when both features are enabled.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic overrides ([`ConfigLoader::merge`])
//! 3. Config file (explicit path, or the first one found in the search paths)
//! 4. Environment variables (`SECLUDED_*`)
//!
//! # Environment Variable Mapping
//!
//! The adapter settings have short names:
//!
//! - `SECLUDED_HOST` → `secluded.host`
//! - `SECLUDED_TOKEN` → `secluded.token`
//! - `SECLUDED_PLUGIN_ID` → `secluded.plugin_id`
//! - `SECLUDED_PLUGIN_NAME` → `secluded.plugin_name`
//!
//! Anything else uses `__` as the path separator:
//!
//! - `SECLUDED_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `SECLUDED_LOGGING__FILTERS__SECLUDED_TRANSPORT=warn` → `logging.filters.secluded_transport`
//!
//! # Example
//!
//! ```rust,ignore
//! use secluded_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load()?;
//!
//! let config = ConfigLoader::new()
//!     .file("./deploy/secluded.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::AppConfig;

/// Prefix of every environment variable the loader reads.
pub const ENV_PREFIX: &str = "SECLUDED_";

/// Keys that map straight onto the `secluded` section.
const SECTION_KEYS: &[&str] = &["host", "token", "plugin_id", "plugin_name"];

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Base figment instance.
    figment: Figment,
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: AppConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<AppConfig> {
        let figment = self.build_figment()?;

        let config: AppConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        debug!(
            host = %config.secluded.host,
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(env_provider());
        }

        Ok(figment)
    }

    /// Merges a single config file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("secluded"));
        }
        paths
    }

    /// Merges the first file found, searching paths in order and names
    /// within each path in order.
    fn load_config_files(&self, figment: Figment) -> Figment {
        #[allow(unused_mut)]
        let mut candidates: Vec<&str> = Vec::new();
        #[cfg(feature = "toml-config")]
        candidates.push("secluded.toml");
        #[cfg(feature = "yaml-config")]
        candidates.extend(["secluded.yaml", "secluded.yml"]);

        for search_path in self.resolve_search_paths() {
            for name in &candidates {
                let path = search_path.join(name);
                if path.exists() {
                    info!(path = %path.display(), "Loading configuration file");
                    return match Self::merge_config_file(figment.clone(), &path) {
                        Ok(merged) => merged,
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "Skipping configuration file");
                            figment
                        }
                    };
                }
            }
        }

        warn!("No configuration file found, using defaults");
        figment
    }
}

/// Environment provider with the `SECLUDED_` mapping.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        if key.contains("__") {
            key.replace("__", ".").into()
        } else if SECTION_KEYS.contains(&key.as_str()) {
            format!("secluded.{key}").into()
        } else {
            key.into()
        }
    })
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<AppConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, with environment overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<AppConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogFormat, LogLevel};
    use figment::Jail;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.level.as_str(), "info");
            assert_eq!(config.secluded.plugin_name, "nonebot");
            assert!(config.secluded.host.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_env_mapping() {
        Jail::expect_with(|jail| {
            jail.set_env("SECLUDED_HOST", "ws://127.0.0.1:9000/ws");
            jail.set_env("SECLUDED_TOKEN", "123456");
            jail.set_env("SECLUDED_PLUGIN_NAME", "bridge");
            jail.set_env("SECLUDED_LOGGING__LEVEL", "debug");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.secluded.host, "ws://127.0.0.1:9000/ws");
            assert_eq!(config.secluded.token, "123456");
            assert_eq!(config.secluded.plugin_name, "bridge");
            assert_eq!(config.secluded.plugin_id, "nonebot");
            assert_eq!(config.logging.level, LogLevel::Debug);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_file_with_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "secluded.toml",
                r#"
                    [logging]
                    format = "pretty"

                    [secluded]
                    host = "ws://file:8080/ws"
                    token = 42
                "#,
            )?;
            jail.set_env("SECLUDED_HOST", "wss://env:443/ws");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.logging.format, LogFormat::Pretty);
            assert_eq!(config.secluded.host, "wss://env:443/ws");
            assert_eq!(config.secluded.token, "42");
            Ok(())
        });
    }

    #[cfg(feature = "yaml-config")]
    #[test]
    fn test_explicit_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "bridge.yaml",
                "secluded:\n  host: ws://yaml:1/ws\n  token: secret\n  plugin_id: 7\n",
            )?;

            let config = ConfigLoader::new()
                .file(jail.directory().join("bridge.yaml"))
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.secluded.host, "ws://yaml:1/ws");
            assert_eq!(config.secluded.plugin_id, "7");
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/secluded.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
