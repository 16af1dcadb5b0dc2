//! Time-bounded result cache in front of a `TrialSource`.
//!
//! Repeating the same search within the TTL is served from memory, so the
//! dashboard can re-run NER or re-render without hitting the registry again.

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use trialnlp_common::{RawStudy, Result};

use crate::sources::TrialSource;

type CacheKey = (String, usize);

pub struct CachedTrialSource<S> {
    inner: S,
    ttl: Duration,
    entries: Mutex<LruCache<CacheKey, (Instant, Vec<RawStudy>)>>,
}

impl<S: TrialSource> CachedTrialSource<S> {
    pub fn new(inner: S, ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl<S: TrialSource> TrialSource for CachedTrialSource<S> {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawStudy>> {
        let key = (query.trim().to_string(), max_results);

        {
            let mut entries = self.entries.lock().await;
            let fresh = entries
                .get(&key)
                .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
                .map(|(_, studies)| studies.clone());
            if let Some(studies) = fresh {
                debug!(query = %key.0, max_results, "trial cache hit");
                return Ok(studies);
            }
            entries.pop(&key);
        }

        // Fetch without holding the lock; errors are not cached.
        let studies = self.inner.search(query, max_results).await?;
        self.entries
            .lock()
            .await
            .put(key, (Instant::now(), studies.clone()));
        Ok(studies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trialnlp_common::TrialNlpError;

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Self {
            Self { calls: AtomicUsize::new(0), fail }
        }
    }

    #[async_trait]
    impl TrialSource for CountingSource {
        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawStudy>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TrialNlpError::Api { status: 503, body: "down".into() });
            }
            Ok((0..max_results)
                .map(|i| RawStudy {
                    nct_id: Some(format!("{query}-{i}")),
                    ..Default::default()
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_second_call_is_cached() {
        let cache = CachedTrialSource::new(CountingSource::new(false), Duration::from_secs(60), 4);
        let a = cache.search("diabetes", 5).await.unwrap();
        let b = cache.search("diabetes", 5).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 1);

        // Different size is a different key
        cache.search("diabetes", 10).await.unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_refetches() {
        let cache = CachedTrialSource::new(CountingSource::new(false), Duration::from_secs(60), 4);
        cache.search("asthma", 5).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        cache.search("asthma", 5).await.unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = CachedTrialSource::new(CountingSource::new(true), Duration::from_secs(60), 4);
        assert!(cache.search("x", 5).await.is_err());
        assert!(cache.search("x", 5).await.is_err());
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recent() {
        let cache = CachedTrialSource::new(CountingSource::new(false), Duration::from_secs(60), 1);
        cache.search("a", 5).await.unwrap();
        cache.search("b", 5).await.unwrap();
        cache.search("a", 5).await.unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len().await, 1);
    }
}
