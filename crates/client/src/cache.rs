//! Page cache for collection responses.
//!
//! Pages are cached per `(owner, resource, search, offset, limit)` with a
//! TTL, so one vendor's pages are never served to another. Concurrent
//! requests for the same page share one backend call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dealdesk_core::UserId;
use moka::future::Cache;
use tracing::debug;

use crate::error::ApiError;

/// Cache key for one page.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct PageKey {
    /// Signed-in vendor the page was fetched for.
    pub owner: Option<UserId>,
    pub resource: &'static str,
    pub search: String,
    pub offset: usize,
    pub limit: usize,
}

/// Cached pages of one record type.
#[derive(Clone)]
pub struct PageCache<T> {
    cache: Cache<PageKey, Arc<Vec<T>>>,
}

impl<T: Clone + Send + Sync + 'static> PageCache<T> {
    #[must_use]
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Return the cached page or run `fetch` to fill it.
    ///
    /// Failures are not cached. Callers that arrive while `fetch` runs wait
    /// for it and receive the same result.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `fetch`.
    pub async fn get_or_fetch<F>(&self, key: PageKey, fetch: F) -> Result<Vec<T>, ApiError>
    where
        F: Future<Output = Result<Vec<T>, ApiError>>,
    {
        if let Some(page) = self.cache.get(&key).await {
            debug!(resource = key.resource, offset = key.offset, "Cache hit for page");
            return Ok(page.as_ref().clone());
        }

        self.cache
            .try_get_with(key, async { fetch.await.map(Arc::new) })
            .await
            .map(|page| page.as_ref().clone())
            .map_err(|e| e.as_ref().clone())
    }

    /// Drop every cached page, e.g. after a mutation.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Number of cached pages (approximate until pending tasks run).
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl<T: Clone + Send + Sync + 'static> std::fmt::Debug for PageCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn key(offset: usize) -> PageKey {
        PageKey {
            owner: Some(UserId::new("u_1")),
            resource: "coupons",
            search: String::new(),
            offset,
            limit: 6,
        }
    }

    #[tokio::test]
    async fn test_second_read_is_cached() {
        let cache = PageCache::new(10, Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let page = cache
                .get_or_fetch(key(0), async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(page, vec![1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: PageCache<u32> = PageCache::new(10, Duration::from_secs(60));

        let err = cache
            .get_or_fetch(key(0), async { Err(ApiError::Transport("down".to_string())) })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));

        let page = cache.get_or_fetch(key(0), async { Ok(vec![7]) }).await.unwrap();
        assert_eq!(page, vec![7]);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = PageCache::new(10, Duration::from_secs(60));
        cache.get_or_fetch(key(0), async { Ok(vec![1]) }).await.unwrap();
        cache.invalidate_all();

        let page = cache.get_or_fetch(key(0), async { Ok(vec![2]) }).await.unwrap();
        assert_eq!(page, vec![2]);
    }

    #[tokio::test]
    async fn test_pages_are_scoped_to_owner() {
        let cache = PageCache::new(10, Duration::from_secs(60));
        cache.get_or_fetch(key(0), async { Ok(vec![1]) }).await.unwrap();

        let other = PageKey {
            owner: Some(UserId::new("u_2")),
            ..key(0)
        };
        let page = cache.get_or_fetch(other, async { Ok(vec![2]) }).await.unwrap();
        assert_eq!(page, vec![2]);
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce() {
        let cache = PageCache::new(10, Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(vec![1, 2])
        };

        let (a, b) = tokio::join!(
            cache.get_or_fetch(key(6), fetch()),
            cache.get_or_fetch(key(6), fetch())
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
