//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::sync::RwLock;

/// A single cached value.
#[derive(Debug, Clone)]
pub struct CachedEntry<T> {
  /// The cached value
  pub value: T,
  /// When the upstream fetch that produced the value started
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  type Value: Clone + Send + Sync;

  /// Get the cached entry, if any.
  fn load(&self) -> Result<Option<CachedEntry<Self::Value>>>;

  /// Replace the cached entry.
  fn store(&self, entry: CachedEntry<Self::Value>) -> Result<()>;
}

/// Process-local storage holding exactly one entry.
///
/// Stores are whole-value replacements, so concurrent writers can race but a
/// reader never observes a partially written entry.
pub struct MemoryStorage<T> {
  slot: RwLock<Option<CachedEntry<T>>>,
}

impl<T> MemoryStorage<T> {
  /// Create an empty, never-fetched slot.
  pub fn new() -> Self {
    Self {
      slot: RwLock::new(None),
    }
  }
}

impl<T> Default for MemoryStorage<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Clone + Send + Sync> CacheStorage for MemoryStorage<T> {
  type Value = T;

  fn load(&self) -> Result<Option<CachedEntry<T>>> {
    let slot = self
      .slot
      .read()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(slot.clone())
  }

  fn store(&self, entry: CachedEntry<T>) -> Result<()> {
    let mut slot = self
      .slot
      .write()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *slot = Some(entry);
    Ok(())
  }
}
