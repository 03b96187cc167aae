//! HTTP surface: liveness banner and the cached sheet endpoint.

mod rate_limit;
mod routes;

use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::sheets::CachedSheetClient;

pub use rate_limit::RateLimiter;
pub use routes::routes;

/// Bind the configured address and serve until Ctrl-C.
pub async fn run(config: &Config) -> Result<()> {
  let client = Arc::new(CachedSheetClient::new(config)?);
  let limiter = Arc::new(RateLimiter::new(config.server.rate_limit));
  let addr = SocketAddr::new(config.server.host, config.server.port);

  let (bound, server) = warp::serve(routes(client, limiter))
    .try_bind_with_graceful_shutdown(addr, shutdown_signal())
    .map_err(|e| eyre!("Failed to bind {}: {}", addr, e))?;

  info!(
    tab = %config.sheet.tab,
    format = ?config.sheet.format,
    ttl_secs = config.cache.ttl_secs,
    "listening on http://{}",
    bound
  );
  server.await;
  info!("server stopped");

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!("Failed to listen for Ctrl-C, running until killed: {}", e);
    std::future::pending::<()>().await;
  }
  info!("shutdown requested");
}
