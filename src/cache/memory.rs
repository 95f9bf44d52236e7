//! In-process cache store
//!
//! Keeps entries in a mutex-guarded map. Used by the CLI's `--no-cache` mode and
//! by hosts that want caching only for the lifetime of the process.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{CacheEntry, CacheError, CacheStore, GetOptions, SetOptions};

type Entries = HashMap<String, CacheEntry<serde_json::Value>>;

/// Cache store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<Entries>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, CacheError> {
        self.entries.lock().map_err(|_| CacheError::Poisoned)
    }
}

impl CacheStore for MemoryCache {
    fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        options: GetOptions,
    ) -> Result<Option<T>, CacheError> {
        let entries = self.lock()?;
        let entry = match entries.get(key) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if !options.ignore_max_age && entry.is_expired() {
            return Ok(None);
        }
        Ok(serde_json::from_value(entry.data.clone()).ok())
    }

    fn is_expired(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.lock()?.get(key).is_some_and(|entry| entry.is_expired()))
    }

    fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry::new(serde_json::to_value(value)?, options)?;
        self.lock()?.insert(key.to_string(), entry);
        Ok(())
    }
}
