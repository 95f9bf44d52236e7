//! Cache stores for search results
//!
//! The orchestrator talks to its cache through the [`CacheStore`] trait. Two
//! stores are provided: [`CacheManager`] persists entries as JSON files in an
//! XDG-compliant cache directory, and [`MemoryCache`] keeps them in process.
//! Both return expired entries on request so callers can fall back to stale
//! data when the network is unavailable.

mod manager;
mod memory;

pub use manager::CacheManager;
pub use memory::MemoryCache;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a cache store
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing storage failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The value could not be serialized for storage
    #[error("Failed to serialize cache value: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The requested max age cannot be represented as an expiry timestamp
    #[error("Invalid cache max age: {0:?}")]
    InvalidTtl(Duration),

    /// A thread panicked while holding the cache lock
    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Options for [`CacheStore::get`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Return the stored value even if it has expired
    pub ignore_max_age: bool,
}

/// Options for [`CacheStore::set`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// How long the entry stays fresh; `None` never expires
    pub max_age: Option<Duration>,
}

/// Key-value store consulted by the search orchestrator
///
/// Reads and writes are synchronous. Errors are surfaced to the caller
/// unchanged; an entry that exists but cannot be decoded as `T` reads as
/// absent.
pub trait CacheStore {
    /// Reads the value stored under `key`
    fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        options: GetOptions,
    ) -> Result<Option<T>, CacheError>;

    /// Reports whether the entry under `key` is past its max age
    ///
    /// Missing entries and entries without a max age are never expired.
    fn is_expired(&self, key: &str) -> Result<bool, CacheError>;

    /// Stores `value` under `key`, replacing any previous entry
    fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<(), CacheError>;
}

/// Stored form of a cache entry, shared by both stores
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The cached data
    data: T,
    /// When the data was cached
    cached_at: DateTime<Utc>,
    /// When the entry expires, if ever
    expires_at: Option<DateTime<Utc>>,
}

impl<T> CacheEntry<T> {
    fn new(data: T, options: SetOptions) -> Result<Self, CacheError> {
        let now = Utc::now();
        let expires_at = match options.max_age {
            Some(max_age) => Some(expiry_after(now, max_age)?),
            None => None,
        };
        Ok(Self {
            data,
            cached_at: now,
            expires_at,
        })
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }
}

fn expiry_after(now: DateTime<Utc>, max_age: Duration) -> Result<DateTime<Utc>, CacheError> {
    chrono::Duration::from_std(max_age)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or(CacheError::InvalidTtl(max_age))
}
