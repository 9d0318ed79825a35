//! Secluded Runtime - process layer for the gateway bridge.
//!
//! This crate provides:
//! - Configuration loading and validation ([`config`])
//! - Logging setup ([`logging`])
//! - Runtime orchestration ([`SecludedRuntime`])
//! - The dispatcher used by the `secluded-bridge` binary ([`BridgeDispatcher`])
//!
//! ```ignore
//! use std::sync::Arc;
//! use secluded_runtime::{BridgeDispatcher, SecludedRuntime};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SecludedRuntime::builder().build()?;
//!
//!     // Run until Ctrl+C
//!     runtime.run(Arc::new(BridgeDispatcher::new())).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{AppConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig};
pub use dispatch::BridgeDispatcher;
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{RuntimeBuilder, SecludedRuntime};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
