//! Cached sheet client that wraps SheetsClient with a TTL cache.

use chrono::Duration;
use color_eyre::Result;
use std::sync::Arc;

use crate::cache::{CacheLayer, CacheResult, Clock, MemoryStorage};
use crate::config::{ColumnsConfig, Config};

use super::client::SheetsClient;
use super::transform::transform;
use super::types::SheetData;

/// Sheet client that serves the transformed sheet from cache while fresh.
#[derive(Clone)]
pub struct CachedSheetClient {
  inner: SheetsClient,
  columns: Arc<ColumnsConfig>,
  cache: CacheLayer<MemoryStorage<Arc<SheetData>>>,
}

impl CachedSheetClient {
  /// Create a new cached sheet client.
  pub fn new(config: &Config) -> Result<Self> {
    let inner = SheetsClient::new(config)?;
    let ttl = Duration::seconds(config.cache.ttl_secs.min(i32::MAX as u64) as i64);
    let cache = CacheLayer::new(MemoryStorage::new()).with_ttl(ttl);

    Ok(Self {
      inner,
      columns: Arc::new(config.sheet.columns.clone()),
      cache,
    })
  }

  /// Replace the clock used for freshness checks.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.cache = self.cache.with_clock(clock);
    self
  }

  /// Get the transformed sheet, fetching upstream only when the cache is stale.
  pub async fn get_data(&self) -> Result<CacheResult<Arc<SheetData>>> {
    self
      .cache
      .fetch(|| {
        let inner = self.inner.clone();
        let columns = Arc::clone(&self.columns);
        async move {
          let grid = inner.fetch_grid().await?;
          Ok(Arc::new(transform(&grid, &columns, inner.tab())))
        }
      })
      .await
  }
}
