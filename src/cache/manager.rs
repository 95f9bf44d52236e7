//! Cache manager for persisting search results to disk
//!
//! Provides a `CacheManager` that stores serializable data to JSON files with
//! expiry timestamps, supporting graceful degradation when the API is unavailable.

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{CacheEntry, CacheError, CacheStore, GetOptions, SetOptions};

/// Longest file name stem written to disk, well under the usual 255-byte limit
const MAX_STEM_LEN: usize = 200;

/// Manages reading and writing cached data to disk
///
/// The cache manager stores data as JSON files in an XDG-compliant cache directory
/// (`~/.cache/npms-search/` on Linux). Each cache entry includes an optional expiry
/// timestamp, and expired entries are still returned when the caller asks to ignore
/// max age.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager using XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "npms-search")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &std::path::Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", file_stem(key)))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Loads the entry for `key`
    ///
    /// A missing file or one that does not parse as an entry of `T` reads as `None`.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, CacheError> {
        let content = match fs::read_to_string(self.cache_path(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content).ok())
    }
}

impl CacheStore for CacheManager {
    fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        options: GetOptions,
    ) -> Result<Option<T>, CacheError> {
        let entry = match self.load::<T>(key)? {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if !options.ignore_max_age && entry.is_expired() {
            return Ok(None);
        }
        Ok(Some(entry.data))
    }

    fn is_expired(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self
            .load::<serde_json::Value>(key)?
            .is_some_and(|entry| entry.is_expired()))
    }

    fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let entry = CacheEntry::new(value, options)?;
        let json = serde_json::to_string_pretty(&entry)?;

        fs::write(self.cache_path(key), json)?;
        Ok(())
    }
}

/// Turns a cache key into a file name stem
///
/// Bytes outside `[A-Za-z0-9._-]` are percent-encoded so queries such as
/// `@scope/name` map to a single file inside the cache directory. Stems longer
/// than `MAX_STEM_LEN` keep a readable prefix and end in `~` plus the SHA-256 of
/// the whole key; `~` never appears in an encoded stem, so the two forms cannot
/// collide.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                stem.push(byte as char)
            }
            _ => stem.push_str(&format!("%{:02X}", byte)),
        }
    }
    if stem.len() <= MAX_STEM_LEN {
        return stem;
    }

    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    // The encoded stem is ASCII, so any byte offset is a char boundary
    stem.truncate(MAX_STEM_LEN - digest.len() - 1);
    stem.push('~');
    stem.push_str(&digest);
    stem
}
