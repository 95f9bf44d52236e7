//! Cached package search
//!
//! [`Searcher`] answers a query from the cache while the cached entry is fresh,
//! refreshes it from the network once it has expired, and falls back to the
//! expired entry when the refresh fails.

use std::time::Duration;

use crate::cache::{CacheStore, GetOptions, SetOptions};
use crate::npms::{self, DisplayRecord, SearchError, SearchTransport};

/// Cache-key prefix identifying this adapter's entries in a shared store
pub const DEFAULT_NAMESPACE: &str = "zazu-npms";

/// How long search results stay fresh
pub const DEFAULT_TTL: Duration = Duration::from_millis(3_600_000);

/// Number of results requested per search
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Settings for a [`Searcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Cache-key prefix
    pub namespace: String,
    /// Cache lifetime of a fetched result
    pub ttl: Duration,
    /// Result-count cap sent to the endpoint
    pub page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl: DEFAULT_TTL,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Where the records returned by [`Searcher::lookup`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// A cached entry that had not expired
    Cache,
    /// A fetch made during this call
    Network,
    /// An expired cached entry, served because the fetch failed
    StaleCache,
}

/// Records returned for a query, with their provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub records: Vec<DisplayRecord>,
    pub source: ResultSource,
}

/// Result of trying to refresh a query from the network
#[derive(Debug)]
pub enum FetchOutcome {
    /// The fetch succeeded
    Fresh(Vec<DisplayRecord>),
    /// The fetch failed and a cached value stands in for it
    Stale(Vec<DisplayRecord>),
    /// The fetch failed with nothing to fall back on, or failed in a way a
    /// cached value must not hide
    Failed(SearchError),
}

impl FetchOutcome {
    /// Decides what a refresh attempt yields given the cached value, if any
    pub fn resolve(
        fetched: Result<Vec<DisplayRecord>, SearchError>,
        cached: Option<Vec<DisplayRecord>>,
    ) -> Self {
        match (fetched, cached) {
            (Ok(records), _) => FetchOutcome::Fresh(records),
            (Err(err), Some(cached)) if err.is_recoverable() => FetchOutcome::Stale(cached),
            (Err(err), _) => FetchOutcome::Failed(err),
        }
    }
}

/// Package search with a cache in front of the network
#[derive(Debug)]
pub struct Searcher<C, T> {
    cache: C,
    transport: T,
    config: SearchConfig,
}

impl<C: CacheStore, T: SearchTransport> Searcher<C, T> {
    /// Creates a searcher with the default namespace, TTL, and page size
    pub fn new(cache: C, transport: T) -> Self {
        Self::with_config(cache, transport, SearchConfig::default())
    }

    pub fn with_config(cache: C, transport: T, config: SearchConfig) -> Self {
        Self {
            cache,
            transport,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Cache key under which results for `query` are stored
    pub fn cache_key(&self, query: &str) -> String {
        format!("{}.{}", self.config.namespace, query)
    }

    /// Searches for packages matching `query`
    ///
    /// # Returns
    /// * `Ok(records)` - Results from a fresh cache entry, the network, or an
    ///   expired cache entry when the network request failed
    /// * `Err(SearchError)` - If the request failed and nothing was cached, the
    ///   response could not be decoded, or the cache store failed
    pub async fn search(&self, query: &str) -> Result<Vec<DisplayRecord>, SearchError> {
        self.lookup(query).await.map(|lookup| lookup.records)
    }

    /// Like [`Searcher::search`], also reporting where the records came from
    pub async fn lookup(&self, query: &str) -> Result<Lookup, SearchError> {
        let key = self.cache_key(query);

        let cached: Option<Vec<DisplayRecord>> = self.cache.get(
            &key,
            GetOptions {
                ignore_max_age: true,
            },
        )?;
        let expired = self.cache.is_expired(&key)?;

        if let Some(records) = cached.as_ref().filter(|_| !expired) {
            tracing::debug!(key = %key, count = records.len(), "Cache hit");
            return Ok(Lookup {
                records: records.clone(),
                source: ResultSource::Cache,
            });
        }

        tracing::debug!(key = %key, stale = cached.is_some(), "Cache miss, fetching");
        let fetched = self.fetch(query).await;

        match FetchOutcome::resolve(fetched, cached) {
            FetchOutcome::Fresh(records) => {
                self.cache.set(
                    &key,
                    &records,
                    SetOptions {
                        max_age: Some(self.config.ttl),
                    },
                )?;
                Ok(Lookup {
                    records,
                    source: ResultSource::Network,
                })
            }
            FetchOutcome::Stale(records) => {
                tracing::warn!(key = %key, "Search request failed, serving expired results");
                Ok(Lookup {
                    records,
                    source: ResultSource::StaleCache,
                })
            }
            FetchOutcome::Failed(err) => Err(err),
        }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<DisplayRecord>, SearchError> {
        let body = self.transport.fetch(query, self.config.page_size).await?;
        Ok(npms::map(npms::decode(&body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MemoryCache};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde::{de::DeserializeOwned, Serialize};
    use std::sync::Mutex;
    use std::thread;

    const FIXTURE: &str = include_str!("../tests/fixtures/search.json");

    const ERROR_BODY: &str = r#"{"code":"INVALID_PARAMETER","message":"child \"text\" fails because [\"text\" is not allowed to be empty]"}"#;

    /// Transport returning a canned response and counting calls
    struct FakeTransport {
        response: Result<String, (StatusCode, String)>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl FakeTransport {
        fn ok(body: &str) -> Self {
            Self {
                response: Ok(body.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: StatusCode, body: &str) -> Self {
            Self {
                response: Err((status, body.to_string())),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchTransport for FakeTransport {
        async fn fetch(&self, query: &str, size: usize) -> Result<String, SearchError> {
            self.calls.lock().unwrap().push((query.to_string(), size));
            match &self.response {
                Ok(body) => Ok(body.clone()),
                Err((status, body)) => Err(SearchError::Endpoint {
                    status: *status,
                    body: body.clone(),
                }),
            }
        }
    }

    /// Memory cache that records every call made to it
    #[derive(Default)]
    struct RecordingCache {
        inner: MemoryCache,
        gets: Mutex<Vec<(String, GetOptions)>>,
        expiry_checks: Mutex<Vec<String>>,
        sets: Mutex<Vec<(String, SetOptions)>>,
        fail_reads: bool,
    }

    impl CacheStore for RecordingCache {
        fn get<V: DeserializeOwned>(
            &self,
            key: &str,
            options: GetOptions,
        ) -> Result<Option<V>, CacheError> {
            self.gets.lock().unwrap().push((key.to_string(), options));
            if self.fail_reads {
                return Err(CacheError::Poisoned);
            }
            self.inner.get(key, options)
        }

        fn is_expired(&self, key: &str) -> Result<bool, CacheError> {
            self.expiry_checks.lock().unwrap().push(key.to_string());
            self.inner.is_expired(key)
        }

        fn set<V: Serialize>(
            &self,
            key: &str,
            value: &V,
            options: SetOptions,
        ) -> Result<(), CacheError> {
            self.sets.lock().unwrap().push((key.to_string(), options));
            self.inner.set(key, value, options)
        }
    }

    fn fixture_records() -> Vec<DisplayRecord> {
        npms::map(npms::decode(FIXTURE).unwrap())
    }

    fn old_records() -> Vec<DisplayRecord> {
        vec![DisplayRecord {
            id: "old-pick".to_string(),
            title: "old-pick".to_string(),
            value: "https://www.npmjs.com/package/old-pick".to_string(),
            subtitle: "from an earlier search".to_string(),
        }]
    }

    fn seed(cache: &RecordingCache, key: &str, records: &[DisplayRecord], max_age: Duration) {
        cache
            .inner
            .set(key, &records, SetOptions { max_age: Some(max_age) })
            .unwrap();
        if max_age.is_zero() {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.namespace, "zazu-npms");
        assert_eq!(config.ttl, Duration::from_millis(3_600_000));
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_cache_key_is_namespaced() {
        let searcher = Searcher::new(MemoryCache::new(), FakeTransport::ok(FIXTURE));
        assert_eq!(searcher.cache_key("git-pick"), "zazu-npms.git-pick");
        assert_eq!(searcher.cache_key(""), "zazu-npms.");

        let custom = Searcher::with_config(
            MemoryCache::new(),
            FakeTransport::ok(FIXTURE),
            SearchConfig {
                namespace: "other".to_string(),
                ..SearchConfig::default()
            },
        );
        assert_eq!(custom.cache_key("git-pick"), "other.git-pick");
    }

    #[tokio::test]
    async fn test_empty_cache_fetches_once_and_writes_with_ttl() {
        let searcher = Searcher::new(RecordingCache::default(), FakeTransport::ok(FIXTURE));

        let records = searcher.search("git-pick").await.unwrap();

        assert_eq!(records, fixture_records());
        assert_eq!(searcher.transport.calls(), vec![("git-pick".to_string(), 10)]);

        let cache = searcher.cache();
        assert_eq!(
            *cache.gets.lock().unwrap(),
            vec![(
                "zazu-npms.git-pick".to_string(),
                GetOptions {
                    ignore_max_age: true
                }
            )]
        );
        assert_eq!(
            *cache.expiry_checks.lock().unwrap(),
            vec!["zazu-npms.git-pick".to_string()]
        );
        assert_eq!(
            *cache.sets.lock().unwrap(),
            vec![(
                "zazu-npms.git-pick".to_string(),
                SetOptions {
                    max_age: Some(Duration::from_millis(3_600_000))
                }
            )]
        );

        let stored: Option<Vec<DisplayRecord>> = cache
            .inner
            .get("zazu-npms.git-pick", GetOptions::default())
            .unwrap();
        assert_eq!(stored, Some(fixture_records()));
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_network() {
        let cache = RecordingCache::default();
        seed(&cache, "zazu-npms.git-pick", &old_records(), Duration::from_secs(60));
        let searcher = Searcher::new(cache, FakeTransport::ok(FIXTURE));

        let lookup = searcher.lookup("git-pick").await.unwrap();

        assert_eq!(lookup.records, old_records());
        assert_eq!(lookup.source, ResultSource::Cache);
        assert!(searcher.transport.calls().is_empty());
        assert!(searcher.cache().sets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_cache_is_refreshed() {
        let cache = RecordingCache::default();
        seed(&cache, "zazu-npms.git-pick", &old_records(), Duration::ZERO);
        let searcher = Searcher::new(cache, FakeTransport::ok(FIXTURE));

        let lookup = searcher.lookup("git-pick").await.unwrap();

        assert_eq!(lookup.records, fixture_records());
        assert_eq!(lookup.source, ResultSource::Network);
        assert_eq!(searcher.transport.calls().len(), 1);

        let stored: Option<Vec<DisplayRecord>> = searcher
            .cache()
            .inner
            .get("zazu-npms.git-pick", GetOptions::default())
            .unwrap();
        assert_eq!(stored, Some(fixture_records()));
    }

    #[tokio::test]
    async fn test_failed_fetch_serves_expired_cache() {
        let cache = RecordingCache::default();
        seed(&cache, "zazu-npms.git-pick", &old_records(), Duration::ZERO);
        let searcher = Searcher::new(
            cache,
            FakeTransport::failing(StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        );

        let lookup = searcher.lookup("git-pick").await.unwrap();

        assert_eq!(lookup.records, old_records());
        assert_eq!(lookup.source, ResultSource::StaleCache);
        assert!(searcher.cache().sets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_without_cache_returns_error_body() {
        let searcher = Searcher::new(
            RecordingCache::default(),
            FakeTransport::failing(StatusCode::BAD_REQUEST, ERROR_BODY),
        );

        let err = searcher.search("").await.unwrap_err();

        assert_eq!(err.response_body(), Some(ERROR_BODY));
        assert_eq!(searcher.transport.calls(), vec![(String::new(), 10)]);
        assert!(searcher.cache().sets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_masked_by_stale_cache() {
        let cache = RecordingCache::default();
        seed(&cache, "zazu-npms.git-pick", &old_records(), Duration::ZERO);
        let searcher = Searcher::new(cache, FakeTransport::ok(r#"{"unexpected":true}"#));

        let err = searcher.search("git-pick").await.unwrap_err();

        assert!(matches!(err, SearchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_serves_expired_cache() {
        let cache = RecordingCache::default();
        seed(&cache, "zazu-npms.git-pick", &old_records(), Duration::ZERO);
        let searcher = Searcher::new(cache, FakeTransport::ok("<html>captive portal</html>"));

        let lookup = searcher.lookup("git-pick").await.unwrap();

        assert_eq!(lookup.records, old_records());
        assert_eq!(lookup.source, ResultSource::StaleCache);
        assert!(searcher.cache().sets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_json_body_without_cache_is_an_error() {
        let searcher = Searcher::new(
            RecordingCache::default(),
            FakeTransport::ok("<html>captive portal</html>"),
        );

        let err = searcher.search("git-pick").await.unwrap_err();

        assert!(matches!(err, SearchError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_cache_failure_propagates() {
        let cache = RecordingCache {
            fail_reads: true,
            ..RecordingCache::default()
        };
        let searcher = Searcher::new(cache, FakeTransport::ok(FIXTURE));

        let err = searcher.search("git-pick").await.unwrap_err();

        assert!(matches!(err, SearchError::Cache(CacheError::Poisoned)));
        assert!(searcher.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_page_size_is_configurable() {
        let searcher = Searcher::with_config(
            MemoryCache::new(),
            FakeTransport::ok(FIXTURE),
            SearchConfig {
                page_size: 25,
                ..SearchConfig::default()
            },
        );

        searcher.search("git-pick").await.unwrap();

        assert_eq!(searcher.transport.calls(), vec![("git-pick".to_string(), 25)]);
    }

    #[tokio::test]
    async fn test_second_search_is_served_from_cache() {
        let searcher = Searcher::new(MemoryCache::new(), FakeTransport::ok(FIXTURE));

        let first = searcher.lookup("git-pick").await.unwrap();
        let second = searcher.lookup("git-pick").await.unwrap();

        assert_eq!(first.source, ResultSource::Network);
        assert_eq!(second.source, ResultSource::Cache);
        assert_eq!(first.records, second.records);
        assert_eq!(searcher.transport.calls().len(), 1);
    }

    #[test]
    fn test_resolve_prefers_fresh_records() {
        let outcome = FetchOutcome::resolve(Ok(fixture_records()), Some(old_records()));
        assert!(matches!(outcome, FetchOutcome::Fresh(records) if records == fixture_records()));
    }

    #[test]
    fn test_resolve_falls_back_on_recoverable_error() {
        let err = SearchError::Endpoint {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        let outcome = FetchOutcome::resolve(Err(err), Some(old_records()));
        assert!(matches!(outcome, FetchOutcome::Stale(records) if records == old_records()));
    }

    #[test]
    fn test_resolve_fails_without_cache() {
        let err = SearchError::Endpoint {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        let outcome = FetchOutcome::resolve(Err(err), None);
        assert!(matches!(outcome, FetchOutcome::Failed(SearchError::Endpoint { .. })));
    }

    #[test]
    fn test_resolve_keeps_decode_error_despite_cache() {
        let decode = serde_json::from_str::<npms::SearchResponse>("{}").unwrap_err();
        let outcome = FetchOutcome::resolve(Err(SearchError::Decode(decode)), Some(old_records()));
        assert!(matches!(outcome, FetchOutcome::Failed(SearchError::Decode(_))));
    }
}
