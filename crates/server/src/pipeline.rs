//! The per-request pipeline: cache lookup, resolution, cache store.
//!
//! The cache is an optimization, never a dependency for correctness:
//! a failed lookup is a miss, and a failed store is logged and
//! swallowed because the link has already been resolved. Concurrent
//! requests for the same unresolved identifier each run a full
//! extraction; there is no single-flight coordination.

use linkmirror_core::{Error, cache_key};
use serde::Serialize;

use crate::state::AppState;

/// Successful fetch result, serialized verbatim as the response body.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutput {
    /// The item identifier as supplied.
    pub id: String,
    /// The resolved public link.
    pub url: String,
    /// Whether the link came from the cache.
    pub cached: bool,
}

/// Resolve `id` to a public link, serving from cache when possible.
pub async fn fetch_link(state: &AppState, id: &str, selector_hint: Option<&str>) -> Result<FetchOutput, Error> {
    let key = cache_key(&state.config.cache_namespace, id);

    match state.cache.get(&key).await {
        Ok(Some(link)) => {
            tracing::debug!(%id, "serving link from cache");
            return Ok(FetchOutput { id: id.to_string(), url: link, cached: true });
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(%id, "cache lookup failed, treating as miss: {e}"),
    }

    let target = state.template.resolve(id)?;
    tracing::info!(%id, %target, "resolving item");

    let link = state.resolver.resolve(id, &target, selector_hint).await?;

    if let Err(e) = state.cache.set(&key, &link, state.config.cache_ttl()).await {
        tracing::warn!(%id, "cache store failed, returning link anyway: {e}");
    }

    Ok(FetchOutput { id: id.to_string(), url: link, cached: false })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use linkmirror_client::{Resolver, TargetTemplate};
    use linkmirror_core::{AppConfig, CacheService, MemoryCache};
    use url::Url;

    struct StubResolver {
        link: String,
        calls: AtomicUsize,
    }

    impl StubResolver {
        fn new(link: &str) -> Self {
            Self { link: link.to_string(), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait::async_trait]
    impl Resolver for StubResolver {
        async fn resolve(&self, _id: &str, _target: &Url, _hint: Option<&str>) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.link.clone())
        }
    }

    struct FailingResolver;

    #[async_trait::async_trait]
    impl Resolver for FailingResolver {
        async fn resolve(&self, _id: &str, _target: &Url, _hint: Option<&str>) -> Result<String, Error> {
            Err(Error::DeadlineExceeded(90_000))
        }
    }

    struct BrokenCache;

    #[async_trait::async_trait]
    impl CacheService for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, Error> {
            Err(Error::Cache("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), Error> {
            Err(Error::Cache("connection refused".into()))
        }
    }

    fn state_with(cache: Arc<dyn CacheService>, resolver: Arc<dyn Resolver>) -> AppState {
        let config = AppConfig::default();
        let template = TargetTemplate::new(&config.url_template).unwrap();
        AppState { config, template, cache, resolver }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_resolution() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .set("linkmirror:12345", "https://public.test/cached", Duration::from_secs(60))
            .await
            .unwrap();
        let resolver = Arc::new(StubResolver::new("https://public.test/fresh"));
        let state = state_with(cache, resolver.clone());

        let output = fetch_link(&state, "12345", None).await.unwrap();
        assert_eq!(output.url, "https://public.test/cached");
        assert!(output.cached);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_miss_resolves_and_stores() {
        let cache = Arc::new(MemoryCache::new());
        let resolver = Arc::new(StubResolver::new("https://public.test/fresh"));
        let state = state_with(cache.clone(), resolver.clone());

        let output = fetch_link(&state, "12345", None).await.unwrap();
        assert_eq!(output.url, "https://public.test/fresh");
        assert!(!output.cached);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

        // the link was written under the namespaced key before responding
        let stored = cache.get("linkmirror:12345").await.unwrap();
        assert_eq!(stored.as_deref(), Some("https://public.test/fresh"));
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let cache = Arc::new(MemoryCache::new());
        let resolver = Arc::new(StubResolver::new("https://public.test/fresh"));
        let state = state_with(cache, resolver.clone());

        let first = fetch_link(&state, "12345", None).await.unwrap();
        let second = fetch_link(&state, "12345", None).await.unwrap();
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.url, second.url);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_broken_cache_is_never_fatal() {
        let resolver = Arc::new(StubResolver::new("https://public.test/fresh"));
        let state = state_with(Arc::new(BrokenCache), resolver.clone());

        // lookup failure falls through to extraction, store failure is
        // swallowed; the caller still gets the link
        let output = fetch_link(&state, "12345", None).await.unwrap();
        assert_eq!(output.url, "https://public.test/fresh");
        assert!(!output.cached);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolver_failure_propagates() {
        let state = state_with(Arc::new(MemoryCache::new()), Arc::new(FailingResolver));

        let result = fetch_link(&state, "12345", None).await;
        assert!(matches!(result, Err(Error::DeadlineExceeded(_))));
    }
}
