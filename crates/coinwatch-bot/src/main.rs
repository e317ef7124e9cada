//! coinwatch entry point.

use anyhow::Result;
use clap::Parser;
use coinwatch_bot::{build_notifier, AppConfig, Application};
use std::path::Path;
use tracing::{info, warn};

/// Watch an exchange feed and send alerts on large orders and price moves.
#[derive(Parser, Debug)]
#[command(name = "coinwatch", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "COINWATCH_CONFIG", default_value = "config/default.toml")]
    config: String,

    /// Log notifications instead of sending them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any wss:// connection
    coinwatch_ws::init_crypto();

    let args = Args::parse();

    // Config first: it selects the log format
    let mut config = AppConfig::load(&args.config)?;
    coinwatch_telemetry::init_logging(config.telemetry.log_format.resolve())?;

    info!("Starting coinwatch v{}", env!("CARGO_PKG_VERSION"));
    if Path::new(&args.config).exists() {
        info!(config_path = %args.config, "Configuration loaded");
    } else {
        warn!(config_path = %args.config, "Config file not found, using defaults and environment");
    }

    if args.dry_run {
        config.notifier.dry_run = true;
    }
    config.validate()?;

    let notifier = build_notifier(&config.notifier, |key| std::env::var(key).ok())?;
    let app = Application::new(config, notifier)?;
    app.run().await?;

    info!("coinwatch stopped");
    Ok(())
}
