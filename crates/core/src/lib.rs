//! Core types for linkmirror.
//!
//! This crate provides the configuration layer, the unified error
//! taxonomy, and the link cache service shared by the client and
//! server crates.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheService, MemoryCache, RedisCache, cache_key};
pub use config::{AppConfig, ConfigError, ExtractionMode};
pub use error::Error;
