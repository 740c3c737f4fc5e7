//! Process-wide memo of remote fetches.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use ureq::Agent;

use crate::error::SourceError;

/// Fetches the bytes behind a URL.
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, failing on transport errors and HTTP status >= 400.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}

/// [`Fetcher`] over HTTP(S) using a pooled `ureq` agent.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let fail = |message: String| SourceError::Fetch {
            url: url.to_owned(),
            message,
        };

        let response = self.agent.get(url).call().map_err(|e| fail(e.to_string()))?;
        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            return Err(fail(format!("HTTP {status}")));
        }

        body.read_to_vec().map_err(|e| fail(e.to_string()))
    }
}

type Slot = Arc<Mutex<Option<Arc<[u8]>>>>;

/// URL-keyed memo of remote content shared by all sessions of a run.
///
/// Concurrent requests for the same URL perform at most one fetch: the first
/// caller holds the per-URL slot while fetching and later callers wait on it.
/// Requests for different URLs never block each other. Failed fetches are
/// not memoized.
pub struct RemoteCache {
    fetcher: Box<dyn Fetcher>,
    entries: DashMap<String, Slot>,
}

impl RemoteCache {
    /// Create an empty cache fetching through `fetcher`.
    #[must_use]
    pub fn new(fetcher: Box<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            entries: DashMap::new(),
        }
    }

    /// Return the content behind `url`, fetching it on first use.
    pub fn get(&self, url: &str) -> Result<Arc<[u8]>, SourceError> {
        // Clone the slot out so the map shard lock is released before fetching.
        let slot = Arc::clone(self.entries.entry(url.to_owned()).or_default().value());
        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(bytes) = cached.as_ref() {
            tracing::debug!(url, "Remote cache hit");
            return Ok(Arc::clone(bytes));
        }

        tracing::debug!(url, "Fetching remote resource");
        let bytes: Arc<[u8]> = self.fetcher.fetch(url)?.into();
        *cached = Some(Arc::clone(&bytes));
        Ok(bytes)
    }

    /// Number of URLs with memoized content.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    /// Whether no content is memoized.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RemoteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCache")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
    }

    impl Fetcher for CountingFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            if url.ends_with("/missing") {
                return Err(SourceError::Fetch {
                    url: url.to_owned(),
                    message: "HTTP 404".to_owned(),
                });
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    fn counting_cache() -> (RemoteCache, Arc<AtomicUsize>) {
        let fetcher = CountingFetcher::default();
        let calls = Arc::clone(&fetcher.calls);
        (RemoteCache::new(Box::new(fetcher)), calls)
    }

    #[test]
    fn test_second_get_is_memoized() {
        let (cache, calls) = counting_cache();

        let first = cache.get("https://x.test/a").unwrap();
        let second = cache.get("https://x.test/a").unwrap();

        assert_eq!(&*first, b"https://x.test/a");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_gets_fetch_once() {
        let (cache, calls) = counting_cache();

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| cache.get("https://x.test/shared").unwrap());
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_urls_fetch_separately() {
        let (cache, calls) = counting_cache();

        cache.get("https://x.test/a").unwrap();
        cache.get("https://x.test/b").unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failures_are_not_memoized() {
        let (cache, calls) = counting_cache();

        assert!(cache.get("https://x.test/missing").is_err());
        assert!(cache.get("https://x.test/missing").is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }
}
