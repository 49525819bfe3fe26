//! Application configuration with layered loading.
//!
//! Sources, highest precedence first:
//!
//! 1. Environment variables (HTTPCACHE_*)
//! 2. TOML config file (if HTTPCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::blob::DEFAULT_BLOB_ROOT;
use crate::cache::CacheOptions;
use crate::hops::UnreachablePolicy;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite record store.
    ///
    /// Set via HTTPCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Root directory of the blob store.
    ///
    /// Set via HTTPCACHE_BLOB_ROOT environment variable.
    #[serde(default = "default_blob_root")]
    pub blob_root: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to read per response body.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum redirects the transport follows for one GET.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Pause before every network request, in milliseconds.
    #[serde(default)]
    pub pause_ms: u64,

    /// Whether an unreachable host is cached as a 599 record.
    #[serde(default = "default_true")]
    pub cache_unreachable: bool,

    /// MIME types stored in the blob store rather than inline.
    ///
    /// Set via HTTPCACHE_EXTERNAL_CONTENT_TYPES (comma-separated).
    #[serde(default = "default_external_content_types", deserialize_with = "comma_list")]
    pub external_content_types: Vec<String>,

    /// Also store `Content-Disposition: attachment` bodies externally.
    #[serde(default)]
    pub store_attachments: bool,

    /// Maximum redirect records followed while resolving one request.
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,

    /// Maximum re-resolutions after an insert conflict.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("cache.sqlite")
}

fn default_blob_root() -> PathBuf {
    PathBuf::from(DEFAULT_BLOB_ROOT)
}

fn default_user_agent() -> String {
    concat!("httpcache/", env!("CARGO_PKG_VERSION")).into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_max_redirects() -> usize {
    30
}

fn default_true() -> bool {
    true
}

fn default_external_content_types() -> Vec<String> {
    vec!["application/pdf".into()]
}

fn default_max_chain_depth() -> usize {
    32
}

fn default_max_restarts() -> usize {
    3
}

/// Accept either a list or a comma-separated string (for env vars).
fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let items = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => s.split(',').map(str::to_string).collect(),
        OneOrMany::Many(v) => v,
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            blob_root: default_blob_root(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            pause_ms: 0,
            cache_unreachable: true,
            external_content_types: default_external_content_types(),
            store_attachments: false,
            max_chain_depth: default_max_chain_depth(),
            max_restarts: default_max_restarts(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    /// The subset of settings the cache orchestrator uses.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            external_content_types: self.external_content_types.clone(),
            store_attachments: self.store_attachments,
            unreachable: if self.cache_unreachable { UnreachablePolicy::Cache } else { UnreachablePolicy::Fail },
            max_chain_depth: self.max_chain_depth,
            max_restarts: self.max_restarts,
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered sources, before extraction.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HTTPCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(Env::prefixed("HTTPCACHE_").ignore(&["config_file"]))
    }

    /// Extract and validate a configuration from `figment`.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("cache.sqlite"));
        assert_eq!(config.blob_root, PathBuf::from(".cached_files"));
        assert!(config.user_agent.starts_with("httpcache/"));
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.pause_ms, 0);
        assert!(config.cache_unreachable);
        assert_eq!(config.external_content_types, ["application/pdf"]);
        assert!(!config.store_attachments);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig { pause_ms: 1000, ..Default::default() };
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.pause(), Duration::from_secs(1));
    }

    #[test]
    fn test_cache_options() {
        let config = AppConfig { cache_unreachable: false, max_restarts: 7, ..Default::default() };
        let options = config.cache_options();
        assert_eq!(options.unreachable, UnreachablePolicy::Fail);
        assert_eq!(options.max_restarts, 7);
        assert_eq!(options.external_content_types, ["application/pdf"]);
    }

    #[test]
    fn test_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("HTTPCACHE_DB_PATH", "/tmp/other.sqlite");
            jail.set_env("HTTPCACHE_PAUSE_MS", "250");
            jail.set_env("HTTPCACHE_EXTERNAL_CONTENT_TYPES", "application/pdf, application/zip");

            let config = AppConfig::from_figment(AppConfig::figment()).unwrap();
            assert_eq!(config.db_path, PathBuf::from("/tmp/other.sqlite"));
            assert_eq!(config.pause_ms, 250);
            assert_eq!(config.external_content_types, ["application/pdf", "application/zip"]);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_layer() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "httpcache.toml",
                r#"
                blob_root = "blobs"
                cache_unreachable = false
                external_content_types = ["application/pdf", "application/epub+zip"]
                "#,
            )?;
            jail.set_env("HTTPCACHE_CONFIG_FILE", "httpcache.toml");
            jail.set_env("HTTPCACHE_BLOB_ROOT", "from-env");

            let config = AppConfig::from_figment(AppConfig::figment()).unwrap();
            assert_eq!(config.blob_root, PathBuf::from("from-env"));
            assert!(!config.cache_unreachable);
            assert_eq!(config.external_content_types.len(), 2);
            Ok(())
        });
    }
}
