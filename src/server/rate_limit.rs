//! Fixed-window request limiter keyed by client address.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};

use crate::cache::{Clock, SystemClock};
use crate::config::RateLimitConfig;

/// Expired windows are dropped once the table holds this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
  started_at: DateTime<Utc>,
  count: u32,
}

/// Request was over quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limited {
  /// Seconds until the client's window resets, rounded up
  pub retry_after_secs: i64,
}

pub struct RateLimiter {
  max_requests: u32,
  window: Duration,
  clock: Arc<dyn Clock>,
  windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
  pub fn new(config: RateLimitConfig) -> Self {
    Self {
      max_requests: config.max_requests,
      window: Duration::seconds(config.window_secs.min(i32::MAX as u64) as i64),
      clock: Arc::new(SystemClock),
      windows: Mutex::new(HashMap::new()),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Count one request from `addr`. Requests with no known address share a bucket.
  pub fn check(&self, addr: Option<IpAddr>) -> Result<(), Limited> {
    let key = addr.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let now = self.clock.now();
    let mut windows = match self.windows.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };

    if windows.len() >= PRUNE_THRESHOLD {
      let window = self.window;
      windows.retain(|_, w| now - w.started_at < window);
    }

    let entry = windows.entry(key).or_insert(Window {
      started_at: now,
      count: 0,
    });
    if now - entry.started_at >= self.window {
      *entry = Window {
        started_at: now,
        count: 0,
      };
    }

    if entry.count >= self.max_requests {
      let remaining = self.window - (now - entry.started_at);
      let secs = remaining.num_seconds() + i64::from(remaining.num_milliseconds() % 1000 != 0);
      return Err(Limited {
        retry_after_secs: secs.max(1),
      });
    }

    entry.count += 1;
    Ok(())
  }
}
