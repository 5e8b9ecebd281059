//! Configuration management.
//!
//! Values come from an optional file, then `CACHET__SECTION__FIELD`
//! environment variables. Every field has a default, so an empty
//! environment yields a runnable in-memory server.

use crate::cache::{CacheConfig, InMemoryStoreConfig, MaintenanceConfig, RedisStoreConfig};
use crate::telemetry::TelemetryConfig;
use serde::Deserialize;
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Key/value store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Engine configuration
    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix applied to every Redis key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Deadline for each store call
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// How often the in-memory store drops expired values; zero disables it
    #[serde(default = "default_purge_interval", with = "humantime_serde")]
    pub purge_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            operation_timeout: default_operation_timeout(),
            purge_interval: default_purge_interval(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory(&self) -> InMemoryStoreConfig {
        InMemoryStoreConfig {
            purge_interval: self.purge_interval,
            ..Default::default()
        }
    }

    pub fn redis(&self) -> RedisStoreConfig {
        RedisStoreConfig {
            url: self.redis_url.clone(),
            key_prefix: self.key_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub default_ttl: Duration,

    /// Payload size in bytes above which values are compressed
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: usize,

    #[serde(default = "default_enable_compression")]
    pub enable_compression: bool,

    #[serde(default = "default_memory_ceiling")]
    pub memory_ceiling_bytes: u64,

    /// Percent
    #[serde(default = "default_hit_rate_floor")]
    pub hit_rate_floor: f64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            compression_threshold: default_compression_threshold(),
            enable_compression: default_enable_compression(),
            memory_ceiling_bytes: default_memory_ceiling(),
            hit_rate_floor: default_hit_rate_floor(),
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_redis_url() -> String { "redis://localhost:6379".to_string() }
fn default_key_prefix() -> String { "cachet:".to_string() }
fn default_operation_timeout() -> Duration { Duration::from_secs(2) }
fn default_purge_interval() -> Duration { Duration::from_secs(60) }
fn default_ttl() -> Duration { Duration::from_secs(300) }
fn default_compression_threshold() -> usize { 1024 }
fn default_enable_compression() -> bool { true }
fn default_memory_ceiling() -> u64 { 100 * 1024 * 1024 }
fn default_hit_rate_floor() -> f64 { 50.0 }

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(environment())
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with the environment layered on top.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(environment())
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Engine configuration assembled from the `store` and `cache` sections.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::builder()
            .default_ttl(self.cache.default_ttl)
            .enable_compression(self.cache.enable_compression)
            .compression_threshold(self.cache.compression_threshold)
            .operation_timeout(self.store.operation_timeout)
            .memory_ceiling_bytes(self.cache.memory_ceiling_bytes)
            .hit_rate_floor(self.cache.hit_rate_floor)
            .build()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("CACHET")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_describe_in_memory_server() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.operation_timeout, Duration::from_secs(2));
        assert_eq!(config.store.in_memory().purge_interval, Duration::from_secs(60));
        assert_eq!(config.cache.compression_threshold, 1024);
        assert_eq!(config.maintenance.top_keys, 5);
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[store]
backend = "redis"
redis_url = "redis://cache:6379"
operation_timeout = "500ms"
purge_interval = "5s"

[cache]
default_ttl = "10m"
compression_threshold = 4096

[maintenance]
sweep_interval = "15m"
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.store.redis().url, "redis://cache:6379");
        assert_eq!(config.store.operation_timeout, Duration::from_millis(500));
        assert_eq!(config.store.purge_interval, Duration::from_secs(5));
        assert_eq!(config.maintenance.sweep_interval, Duration::from_secs(900));

        let cache = config.cache_config();
        assert_eq!(cache.default_ttl, Duration::from_secs(600));
        assert_eq!(cache.compression_threshold, 4096);
        assert_eq!(cache.operation_timeout, Duration::from_millis(500));
    }
}
