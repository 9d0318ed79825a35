//! Process-level orchestration.
//!
//! The runtime owns the loaded configuration, installs logging and drives a
//! [`ReconnectSupervisor`] until a shutdown signal arrives.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use secluded_runtime::SecludedRuntime;
//!
//! // Loads secluded.toml / secluded.yaml and SECLUDED_* variables
//! let runtime = SecludedRuntime::builder().build()?;
//! runtime.run(dispatcher).await?;
//!
//! // Use pre-loaded config
//! let config = load_config_from_file("deploy/secluded.yaml")?;
//! let runtime = SecludedRuntime::from_config(&config);
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tracing::info;

use secluded_adapter::{ReconnectSupervisor, SupervisorHandle};
use secluded_core::{BoxedConnector, Dispatcher};
use secluded_transport::WsConnector;

use crate::config::{AppConfig, ConfigLoader, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Runs one bridge to the gateway configured in [`AppConfig::secluded`].
pub struct SecludedRuntime {
    config: AppConfig,
    connector: BoxedConnector,
}

impl SecludedRuntime {
    /// Creates a runtime builder that loads configuration from the usual
    /// places.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging from `config.logging`; a subscriber installed
    /// earlier is left in place.
    pub fn from_config(config: &AppConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            host = %config.secluded.host,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            connector: Arc::new(WsConnector::new()),
        }
    }

    /// Replaces the websocket connector.
    pub fn with_connector(mut self, connector: BoxedConnector) -> Self {
        self.connector = connector;
        self
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Spawns the supervisor and returns its handle.
    pub fn start(&self, dispatcher: Arc<dyn Dispatcher>) -> SupervisorHandle {
        let supervisor = ReconnectSupervisor::new(
            self.config.secluded.clone(),
            Arc::clone(&self.connector),
            dispatcher,
        );
        info!(host = %self.config.secluded.host, "Starting bridge");
        supervisor.spawn()
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self, dispatcher: Arc<dyn Dispatcher>) -> RuntimeResult<()> {
        let handle = self.start(dispatcher);
        info!("Bridge is now running. Press Ctrl+C to stop.");

        let result = wait_for_shutdown().await;
        handle.shutdown().await;
        info!("Bridge stopped");

        result
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(&self, dispatcher: Arc<dyn Dispatcher>, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let handle = self.start(dispatcher);
        shutdown.await;
        handle.shutdown().await;
        info!("Bridge stopped");
        Ok(())
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`SecludedRuntime`] from loaded configuration.
///
/// ```rust,ignore
/// let runtime = SecludedRuntime::builder()
///     .config_file("deploy/secluded.toml")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    connector: Option<BoxedConnector>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            connector: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: AppConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `connector` instead of the websocket connector.
    pub fn connector(mut self, connector: BoxedConnector) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    pub fn build(self) -> RuntimeResult<SecludedRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;

        let runtime = SecludedRuntime::from_config(&config);
        Ok(match self.connector {
            Some(connector) => runtime.with_connector(connector),
            None => runtime,
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
