//! Cache service contract.

use std::time::Duration;

use crate::Error;

/// Build the namespaced cache key for an item identifier.
///
/// Keys are addressed as `<namespace>:<identifier>`.
pub fn cache_key(namespace: &str, id: &str) -> String {
    format!("{namespace}:{id}")
}

/// String-keyed get/set with expiry.
///
/// Entries are never mutated in place; `set` overwrites wholesale and
/// resets the TTL.
#[async_trait::async_trait]
pub trait CacheService: Send + Sync {
    /// Look up a previously resolved link.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store a resolved link under `key` for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_shape() {
        assert_eq!(cache_key("linkmirror", "12345"), "linkmirror:12345");
    }
}
