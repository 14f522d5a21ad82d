//! In-process cache implementation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::Error;
use crate::cache::CacheService;

/// In-memory cache with per-entry expiry.
///
/// Used by tests and when running without a Redis backend. Expired
/// entries are dropped lazily on lookup.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("linkmirror:absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new();
        cache.set("linkmirror:1", "https://example.test/a", Duration::from_secs(60)).await.unwrap();
        let value = cache.get("linkmirror:1").await.unwrap();
        assert_eq!(value.as_deref(), Some("https://example.test/a"));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let cache = MemoryCache::new();
        cache.set("linkmirror:1", "https://example.test/a", Duration::from_secs(60)).await.unwrap();
        cache.set("linkmirror:1", "https://example.test/b", Duration::from_secs(60)).await.unwrap();
        let value = cache.get("linkmirror:1").await.unwrap();
        assert_eq!(value.as_deref(), Some("https://example.test/b"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache.set("linkmirror:1", "https://example.test/a", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.get("linkmirror:1").await.unwrap(), None);
    }
}
