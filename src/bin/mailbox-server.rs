//! Relay server entry point

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use mailbox_relay::config::{read_port_file, LoggingConfig, RelayConfig, DEFAULT_PORT_FILE};
use mailbox_relay::error::Result;
use mailbox_relay::protocol::Router;
use mailbox_relay::transport;
use mailbox_relay::utils::logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "mailbox-server", about = "Store-and-forward messaging relay")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File holding the port to listen on
    #[arg(short, long, default_value = DEFAULT_PORT_FILE)]
    port_file: PathBuf,

    /// Interface to bind, overriding the configuration
    #[arg(long)]
    host: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        // No-op when run() already installed the configured subscriber
        init_logging(&LoggingConfig::default());
        error!(error = %e, "Relay server failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => RelayConfig::from_file(path)?,
        None => RelayConfig::default(),
    };
    config.apply_env_overrides()?;
    if cli.verbose {
        config.logging.log_level = tracing::Level::DEBUG;
    }
    init_logging(&config.logging);

    // The port file wins over the configured port
    config.server.port = read_port_file(&cli.port_file);
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    config.validate_strict()?;

    info!(address = %config.server.bind_address(), "Starting relay server");
    transport::start_server(&config.server, Router::default()).await?;
    info!("Relay server exited");
    Ok(())
}
