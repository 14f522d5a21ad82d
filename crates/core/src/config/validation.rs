//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// A malformed URL template is a startup-time failure, never a
    /// request-time one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `url_template` lacks the `{id}` placeholder
    /// - `cache_ttl_secs` is 0
    /// - any timeout is outside its sane bounds
    /// - `rclone_remote` or `rclone_folder` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.url_template.contains("{id}") {
            return Err(ConfigError::Invalid {
                field: "url_template".into(),
                reason: "must contain the {id} placeholder".into(),
            });
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.step_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "step_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.request_timeout_ms < self.step_timeout_ms {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms".into(),
                reason: "must not be shorter than step_timeout_ms".into(),
            });
        }
        if self.request_timeout_ms > 600_000 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms".into(),
                reason: "must not exceed 10 minutes (600000ms)".into(),
            });
        }

        if self.rclone_remote.is_empty() {
            return Err(ConfigError::Invalid { field: "rclone_remote".into(), reason: "must not be empty".into() });
        }
        if self.rclone_folder.is_empty() {
            return Err(ConfigError::Invalid { field: "rclone_folder".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
