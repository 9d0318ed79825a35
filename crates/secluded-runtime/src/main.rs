//! `secluded-bridge`: connects to a Secluded gateway and logs what it sees.
//!
//! ```bash
//! secluded-bridge --config deploy/secluded.toml --log-level debug --echo
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use secluded_runtime::config::{ConfigLoader, LogLevel, validate_config};
use secluded_runtime::{BridgeDispatcher, SecludedRuntime};

#[derive(Debug, Parser)]
#[command(name = "secluded-bridge", version, about = "Bridge a Secluded gateway to a bot dispatcher")]
struct Cli {
    /// Configuration file (toml or yaml). Searched for when omitted.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Overrides logging.level.
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Answer `/echo <text>` messages.
    #[arg(long)]
    echo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let mut config = loader.load().context("failed to load configuration")?;

    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    validate_config(&config).context("invalid configuration")?;

    let runtime = SecludedRuntime::from_config(&config);
    let dispatcher = BridgeDispatcher::new().with_echo(cli.echo);
    runtime.run(Arc::new(dispatcher)).await?;

    Ok(())
}
