//! Tag-indexed cache-aside layer.
//!
//! This module provides:
//!
//! - **Store Abstraction**: pluggable key/value stores (in-memory, Redis)
//! - **Payload Codec**: marker-framed compression above a size threshold
//! - **Key Index**: per-key metadata kept in lockstep with a tag index
//! - **Invalidation**: by key, by tag, by wildcard pattern, by namespace
//! - **Maintenance**: periodic expiry sweep and activity report
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          CacheEngine                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌──────────────────┐  ┌─────────────────────┐  │
//! │  │ PayloadCodec│  │ CacheIndex       │  │ InvalidationBus     │  │
//! │  │ (LZ4/none)  │  │ (metadata + tags)│  │ (local broadcast)   │  │
//! │  └──────┬──────┘  └──────────────────┘  └─────────────────────┘  │
//! │         ▼                                                        │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                  KeyValueStore trait                       │  │
//! │  └──────────────┬─────────────────────────────┬───────────────┘  │
//! │                 ▼                             ▼                  │
//! │         ┌──────────────┐              ┌──────────────┐           │
//! │         │ InMemoryStore│              │  RedisStore  │           │
//! │         └──────────────┘              └──────────────┘           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use cachet_core::cache::{CacheEngine, CacheOptions};
//!
//! let engine = CacheEngine::in_memory();
//! let opts = CacheOptions::new().tag("users").namespace("acme");
//!
//! engine.set("user:42", &user, &opts).await?;
//! let cached: Option<User> = engine.get("user:42", &opts).await;
//!
//! engine.invalidate_by_tags(&["users".to_string()]).await;
//! ```

pub mod codec;
pub mod engine;
pub mod index;
pub mod invalidation;
pub mod key;
pub mod maintenance;
pub mod options;
pub mod stats;
pub mod store;

pub use codec::{Codec, Lz4Codec, NoopCodec, PayloadCodec, COMPRESSION_MARKER};
pub use engine::{BatchEntry, CacheEngine, WarmEntry, WarmSummary};
pub use index::{CacheIndex, EntryMetadata};
pub use invalidation::{InvalidationBus, InvalidationEvent, InvalidationRecord, KeyPattern};
pub use key::{CacheKey, KeyBuilder};
pub use maintenance::{
    MaintenanceConfig, MaintenanceReport, MaintenanceScheduler, MaintenanceState, SweepReport,
};
pub use options::CacheOptions;
pub use stats::{CacheStats, StatsCounters};
pub use store::{
    InMemoryStore, InMemoryStoreConfig, KeyValueStore, PurgeHandle, RedisStore, RedisStoreConfig,
};

use crate::health::HealthThresholds;
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Cache Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when a write supplies none
    pub default_ttl: Duration,

    /// Compress payloads above the threshold without being asked
    pub enable_compression: bool,

    /// Compression threshold in bytes
    pub compression_threshold: usize,

    /// Deadline for each store call
    pub operation_timeout: Duration,

    /// Health check memory ceiling in bytes
    pub memory_ceiling_bytes: u64,

    /// Health check hit-rate floor, percent
    pub hit_rate_floor: f64,

    pub event_channel_capacity: usize,

    pub invalidation_log_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300), // 5 minutes
            enable_compression: true,
            compression_threshold: 1024, // 1 KB
            operation_timeout: Duration::from_secs(2),
            memory_ceiling_bytes: 100 * 1024 * 1024, // 100 MB
            hit_rate_floor: 50.0,
            event_channel_capacity: 1024,
            invalidation_log_capacity: 100,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    pub fn thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            hit_rate_floor: self.hit_rate_floor,
            memory_ceiling_bytes: self.memory_ceiling_bytes,
            ..Default::default()
        }
    }
}

/// Builder for cache configuration.
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    pub fn enable_compression(mut self, enabled: bool) -> Self {
        self.config.enable_compression = enabled;
        self
    }

    pub fn compression_threshold(mut self, threshold: usize) -> Self {
        self.config.compression_threshold = threshold;
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    pub fn memory_ceiling_bytes(mut self, bytes: u64) -> Self {
        self.config.memory_ceiling_bytes = bytes;
        self
    }

    pub fn hit_rate_floor(mut self, percent: f64) -> Self {
        self.config.hit_rate_floor = percent;
        self
    }

    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.event_channel_capacity = capacity;
        self
    }

    pub fn invalidation_log_capacity(mut self, capacity: usize) -> Self {
        self.config.invalidation_log_capacity = capacity;
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.compression_threshold, 1024);
        assert_eq!(config.operation_timeout, Duration::from_secs(2));
        assert!(config.enable_compression);
    }

    #[test]
    fn test_builder_feeds_thresholds() {
        let config = CacheConfig::builder()
            .hit_rate_floor(75.0)
            .memory_ceiling_bytes(4096)
            .compression_threshold(64)
            .build();

        let thresholds = config.thresholds();
        assert_eq!(thresholds.hit_rate_floor, 75.0);
        assert_eq!(thresholds.memory_ceiling_bytes, 4096);
        assert_eq!(config.compression_threshold, 64);
    }
}
