//! Link cache for resolved public URLs.
//!
//! Provides a [`CacheService`] trait with two implementations:
//! - [`RedisCache`] - Production Redis-backed cache
//! - [`MemoryCache`] - In-process implementation for tests and
//!   cache-disabled operation
//!
//! The cache is strictly an optimization: callers are expected to
//! treat a failed lookup as a miss and a failed store as non-fatal.

mod memory_cache;
mod redis_cache;
mod service;

pub use memory_cache::MemoryCache;
pub use redis_cache::RedisCache;
pub use service::{CacheService, cache_key};
