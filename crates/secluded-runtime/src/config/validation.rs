//! Configuration validation utilities.

use tracing::warn;

use secluded_adapter::SecludedConfig;

use super::error::{ConfigError, ConfigResult};
use super::schema::{AppConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &AppConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_secluded_config(&config.secluded)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        warn!("logging.output is `file` but logging.file_path is unset, stdout will be used");
    }

    if logging.filters.keys().any(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation(
            "logging.filters keys must name a module",
        ));
    }

    Ok(())
}

fn validate_secluded_config(config: &SecludedConfig) -> ConfigResult<()> {
    validate_url(&config.host, "secluded.host")?;

    if config.token.is_empty() {
        return Err(ConfigError::missing_field("secluded.token"));
    }

    if config.plugin_id.is_empty() {
        return Err(ConfigError::missing_field("secluded.plugin_id"));
    }

    if config.plugin_name.is_empty() {
        return Err(ConfigError::missing_field("secluded.plugin_name"));
    }

    Ok(())
}

/// Validates a websocket URL.
fn validate_url(url: &str, field: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field(field));
    }

    let valid_schemes = ["ws://", "wss://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    if url.len() <= url.find("://").map_or(0, |i| i + 3) {
        return Err(ConfigError::invalid_url(url, "URL has no host"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            secluded: SecludedConfig::new("ws://127.0.0.1:8080/ws", "123456"),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid()).is_ok());

        let mut config = valid();
        config.secluded.host = "wss://gateway.example.com/ws".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_missing_host() {
        let mut config = valid();
        config.secluded.host.clear();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "secluded.host"));
    }

    #[test]
    fn test_invalid_scheme() {
        let mut config = valid();
        config.secluded.host = "http://127.0.0.1:8080/ws".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));

        config.secluded.host = "ws://".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_missing_token_and_plugin() {
        let mut config = valid();
        config.secluded.token.clear();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("secluded.token"));

        let mut config = valid();
        config.secluded.plugin_id.clear();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("secluded.plugin_id"));
    }

    #[test]
    fn test_file_output_without_path_is_allowed() {
        let mut config = valid();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_blank_filter_module() {
        let mut config = valid();
        config
            .logging
            .filters
            .insert(" ".into(), crate::config::LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
