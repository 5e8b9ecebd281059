#![allow(clippy::result_large_err)]
//! # Cachet Core
//!
//! Tag-indexed, namespace-aware cache-aside engine in front of an external
//! key/value store.
//!
//! ## Architecture
//!
//! - **Cache**: the engine, its key metadata and tag index, payload codec,
//!   store adapters and background maintenance
//! - **Health**: issue collection and status grading for the engine
//! - **API**: admin HTTP surface over the engine
//! - **Telemetry**: structured logging and Prometheus metrics
//! - **Config**: layered file and environment configuration

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod telemetry;

pub use error::{CachetError, ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{
        BatchEntry, CacheConfig, CacheEngine, CacheKey, CacheOptions, CacheStats, EntryMetadata,
        InMemoryStore, KeyValueStore, MaintenanceScheduler, RedisStore, WarmEntry,
    };
    pub use crate::error::{CachetError, ErrorCode, ErrorContext, Result};
    pub use crate::health::{HealthReport, HealthStatus};
}
