//! Limits and sanity checks applied to `AppConfig` once the figment
//! layers have been merged. Anything that passes here is safe to hand
//! to the store, the origin client, and the reconciler loop.

use crate::config::AppConfig;
use thiserror::Error;

/// Errors surfaced while loading or checking configuration.
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
    /// Check loaded configuration values before anything opens a store
    /// or builds a client from them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when:
    /// - `cache_name` or `user_agent` is empty
    /// - `max_bytes` is zero or above the 50MB ceiling
    /// - `timeout_ms` falls outside 100ms..=300000ms
    /// - `descriptor_path` or a precache entry is not origin-relative
    /// - `origin` is set but does not parse as an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_name.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_name".into(), reason: "must not be empty".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be nonzero".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "exceeds the 50MB ceiling".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must be at most 300000ms (5 minutes)".into(),
            });
        }

        if !self.descriptor_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "descriptor_path".into(),
                reason: "must be origin-relative (start with '/')".into(),
            });
        }

        for path in &self.precache {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: "precache".into(),
                    reason: format!("entry '{path}' must be origin-relative (start with '/')"),
                });
            }
        }

        if self.origin.is_some() {
            self.require_origin()?;
        }

        if !self.precache.iter().any(|p| p == &self.descriptor_path) {
            tracing::warn!(
                descriptor_path = %self.descriptor_path,
                "descriptor_path is not in the precache list; \
                 the descriptor will only be cached after its first fetch"
            );
        }

        Ok(())
    }
}
