//! npms package search library
//!
//! Searches npm packages through the npms.io API and keeps results in a
//! time-based cache. [`Searcher`] is the entry point for hosts.

pub mod cache;
pub mod cli;
pub mod logging;
pub mod npms;
pub mod output;
pub mod search;

pub use cache::{CacheManager, CacheStore, MemoryCache};
pub use npms::{DisplayRecord, NpmsClient, SearchError, SearchTransport};
pub use search::{Lookup, ResultSource, SearchConfig, Searcher};
