//! Application configuration with layered loading.
//!
//! Configuration is loaded with figment from multiple sources:
//!
//! 1. Environment variables (LINKMIRROR_*)
//! 2. TOML config file (if LINKMIRROR_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which extraction strategy the browser pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Resolve the download control to an absolute URL and return it
    /// directly; the caller performs the actual fetch.
    Resolve,

    /// Click the control, capture the response bytes in-browser, and
    /// mirror them to the configured remote.
    Capture,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LINKMIRROR_*)
/// 2. TOML config file (if LINKMIRROR_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Target page URL template containing a `{id}` placeholder.
    ///
    /// Set via LINKMIRROR_URL_TEMPLATE environment variable.
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Redis connection string for the link cache.
    ///
    /// Set via LINKMIRROR_REDIS_URL environment variable.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Cached link time-to-live in seconds.
    ///
    /// Set via LINKMIRROR_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Namespace prefix for cache keys.
    #[serde(default = "default_cache_namespace")]
    pub cache_namespace: String,

    /// Optional path to a Chromium executable.
    ///
    /// Set via LINKMIRROR_BROWSER_EXECUTABLE environment variable.
    /// When unset the browser library auto-detects an installation.
    #[serde(default)]
    pub browser_executable: Option<PathBuf>,

    /// rclone remote name (must be configured in rclone beforehand).
    #[serde(default = "default_rclone_remote")]
    pub rclone_remote: String,

    /// Folder inside the rclone remote that receives mirrored files.
    #[serde(default = "default_rclone_folder")]
    pub rclone_folder: String,

    /// Extraction mode: `resolve` or `capture`.
    #[serde(default = "default_mode")]
    pub mode: ExtractionMode,

    /// Delay after page load for client-side rendering to settle, in
    /// milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Timeout for each sub-operation (navigation, quiescence wait,
    /// response interception) in milliseconds.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,

    /// Overall per-request deadline covering extraction plus publish,
    /// in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// HTTP listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_url_template() -> String {
    "https://example.test/item/{id}".into()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".into()
}

fn default_cache_ttl_secs() -> u64 {
    60 * 60 * 24
}

fn default_cache_namespace() -> String {
    "linkmirror".into()
}

fn default_rclone_remote() -> String {
    "mega".into()
}

fn default_rclone_folder() -> String {
    "linkmirror_cache".into()
}

fn default_mode() -> ExtractionMode {
    ExtractionMode::Resolve
}

fn default_settle_delay_ms() -> u64 {
    2_500
}

fn default_step_timeout_ms() -> u64 {
    15_000
}

fn default_request_timeout_ms() -> u64 {
    90_000
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            redis_url: default_redis_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_namespace: default_cache_namespace(),
            browser_executable: None,
            rclone_remote: default_rclone_remote(),
            rclone_folder: default_rclone_folder(),
            mode: default_mode(),
            settle_delay_ms: default_settle_delay_ms(),
            step_timeout_ms: default_step_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            listen_addr: default_listen_addr(),
        }
    }
}

impl AppConfig {
    /// Cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Post-load settle delay as a Duration.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Per-sub-operation timeout as a Duration.
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    /// Overall per-request deadline as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `LINKMIRROR_`
    /// 2. TOML file from `LINKMIRROR_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or validation
    /// fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("LINKMIRROR_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("LINKMIRROR_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
