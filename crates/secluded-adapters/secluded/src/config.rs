//! Adapter configuration.
//!
//! Loaded as the `secluded` section of the runtime configuration file.
//!
//! # Example Configuration
//!
//! ```yaml
//! secluded:
//!   host: ws://127.0.0.1:8080/ws
//!   token: 123456
//!   plugin_id: nonebot
//!   plugin_name: nonebot
//! ```
//!
//! `token`, `plugin_id` and `plugin_name` may be written as numbers; they
//! are always stored as strings.

use serde::{Deserialize, Deserializer, Serialize};

/// Gateway connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecludedConfig {
    /// Websocket URL of the gateway.
    #[serde(default)]
    pub host: String,

    /// Plugin token presented in the handshake.
    #[serde(default, deserialize_with = "string_or_number")]
    pub token: String,

    /// Plugin id presented in the handshake.
    #[serde(default = "default_plugin", deserialize_with = "string_or_number")]
    pub plugin_id: String,

    /// Plugin name presented in the handshake.
    #[serde(default = "default_plugin", deserialize_with = "string_or_number")]
    pub plugin_name: String,
}

fn default_plugin() -> String {
    "nonebot".to_string()
}

impl Default for SecludedConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            token: String::new(),
            plugin_id: default_plugin(),
            plugin_name: default_plugin(),
        }
    }
}

impl SecludedConfig {
    /// Creates a configuration with default plugin identity.
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            ..Default::default()
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        String(String),
        Int(i64),
        Uint(u64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::String(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Uint(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}
