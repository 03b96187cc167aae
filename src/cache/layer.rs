//! Cache layer that orchestrates TTL checks with network fetching.

use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::storage::{CacheStorage, CachedEntry};
use super::traits::{CacheResult, Clock, SystemClock};

/// Cache layer that manages freshness and network fetching.
///
/// There is no in-flight deduplication: two callers that both see a stale
/// entry both run their fetcher, and whichever stores last wins.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  clock: Arc<dyn Clock>,
  /// How long a stored value is served without refetching
  ttl: Duration,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      clock: Arc::new(SystemClock),
      ttl: Duration::seconds(30),
    }
  }

  /// Set the time-to-live for cached data.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Replace the clock used for freshness checks.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
    self.clock.now() - cached_at < self.ttl
  }

  /// Fetch with a cache-first strategy.
  ///
  /// 1. If a stored value is younger than the TTL, return it unchanged
  /// 2. Otherwise run the fetcher and store its result stamped with the fetch start time
  /// 3. On fetcher failure, return the error and leave the stored value alone
  pub async fn fetch<F, Fut>(&self, fetcher: F) -> Result<CacheResult<S::Value>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<S::Value>>,
  {
    if let Some(cached) = self.storage.load()? {
      if self.is_fresh(cached.cached_at) {
        debug!(cached_at = %cached.cached_at, "cache hit");
        return Ok(CacheResult::from_cache(cached.value, cached.cached_at));
      }
      debug!(cached_at = %cached.cached_at, "cache stale");
    }

    let started_at = self.clock.now();
    let value = fetcher().await?;
    self.storage.store(CachedEntry {
      value: value.clone(),
      cached_at: started_at,
    })?;

    Ok(CacheResult::from_network(value, started_at))
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      ttl: self.ttl,
    }
  }
}
