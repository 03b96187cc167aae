mod cache;
mod config;
mod server;
mod sheets;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sheet-relay")]
#[command(about = "Serves a spreadsheet's status grid as cached, reshaped JSON")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./sheet-relay.yaml or $XDG_CONFIG_HOME/sheet-relay/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Port to listen on, overrides config and PORT
  #[arg(short, long)]
  port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
  fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(writer)
    .init();

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override port if specified on command line
  let config = if let Some(port) = args.port {
    config::Config {
      server: config::ServerConfig {
        port,
        ..config.server
      },
      ..config
    }
  } else {
    config
  };

  info!("starting sheet-relay {}", env!("CARGO_PKG_VERSION"));
  server::run(&config).await
}
