//! Gateway configuration, merged by figment from three layers:
//!
//! 1. Environment variables (SHLTR_*)
//! 2. TOML config file (if SHLTR_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Every field has a working default except `origin`, which callers
//! resolve through [`AppConfig::require_origin`] when they need it.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::store::CacheName;

mod validation;

pub use validation::ConfigError;

/// Settings shared by the store, the origin client, and the reconciler.
///
/// Construct via [`AppConfig::load`] for the layered merge, or
/// `Default::default()` in tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite response store.
    ///
    /// Set via SHLTR_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Name of the cache generation every pipeline and detector operation
    /// is scoped to. Bumping it abandons the previous generation.
    ///
    /// Set via SHLTR_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Base origin the gateway fronts (scheme + host, e.g.
    /// "https://app.example").
    ///
    /// Set via SHLTR_ORIGIN environment variable.
    /// Required for anything that touches the network.
    #[serde(default)]
    pub origin: Option<String>,

    /// Well-known path of the canonical descriptor document.
    ///
    /// Set via SHLTR_DESCRIPTOR_PATH environment variable.
    #[serde(default = "default_descriptor_path")]
    pub descriptor_path: String,

    /// Paths precached during install, resolved against the origin.
    ///
    /// Set via SHLTR_PRECACHE environment variable (TOML array syntax)
    /// or the config file.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// User-Agent string for origin requests.
    ///
    /// Set via SHLTR_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per origin request.
    ///
    /// Set via SHLTR_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Origin request timeout in milliseconds.
    ///
    /// Set via SHLTR_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Seconds between identity checks in the reconciler binary.
    /// Zero means check once and exit.
    ///
    /// Set via SHLTR_CHECK_INTERVAL_SECS environment variable.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shltr-cache.sqlite")
}

fn default_cache_name() -> String {
    "app-shell-v1".into()
}

fn default_descriptor_path() -> String {
    "/manifest.json".into()
}

fn default_precache() -> Vec<String> {
    vec!["/manifest.json".into()]
}

fn default_user_agent() -> String {
    "shltr/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_check_interval_secs() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_name: default_cache_name(),
            origin: None,
            descriptor_path: default_descriptor_path(),
            precache: default_precache(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Origin fetch timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured cache name as a typed value.
    pub fn cache(&self) -> CacheName {
        CacheName::new(&self.cache_name)
    }

    /// Merge configuration from every layer, highest wins:
    /// `SHLTR_`-prefixed environment variables, then the TOML file named
    /// by `SHLTR_CONFIG_FILE`, then built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a layer fails to parse or the merged
    /// result fails [`AppConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHLTR_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHLTR_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The base origin as a parsed URL (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no origin is configured, or
    /// `ConfigError::Invalid` if the configured value does not parse as an
    /// http(s) URL.
    pub fn require_origin(&self) -> Result<Url, ConfigError> {
        let raw = self.origin.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "origin".into(),
            hint: "Set SHLTR_ORIGIN environment variable".into(),
        })?;

        let url = Url::parse(raw)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme: {scheme}"),
            }),
        }
    }
}
