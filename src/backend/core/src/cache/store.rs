//! Key/value store adapters.
//!
//! The engine treats the store as a dumb byte container with per-key TTL.
//! Everything else (metadata, tags, statistics) lives in the engine.
//!
//! - **InMemoryStore**: process-local store on a sharded `DashMap`
//! - **RedisStore**: networked store over a Redis `ConnectionManager`

use crate::error::{CachetError, ErrorCode, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Store Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Async byte store with per-key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a live value. Expired or absent keys yield `None`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value that expires after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove a key. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Short identifier used as a metrics label.
    fn name(&self) -> &'static str;
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-Memory Store
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration for the in-memory store.
#[derive(Debug, Clone)]
pub struct InMemoryStoreConfig {
    /// Shard count for concurrent access (power of 2)
    pub shard_count: usize,

    /// Period of the background purge started by [`InMemoryStore::spawn_purger`]
    pub purge_interval: Duration,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self {
            shard_count: 16,
            purge_interval: Duration::from_secs(60),
        }
    }
}

struct StoredValue {
    data: Vec<u8>,
    expires_at: Instant,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local store. Expired values are dropped lazily on access and in
/// bulk by [`InMemoryStore::purge_expired`], which [`spawn_purger`] runs on a
/// timer so keys that are never read again still go away.
///
/// [`spawn_purger`]: InMemoryStore::spawn_purger
pub struct InMemoryStore {
    values: DashMap<String, StoredValue>,
    purge_interval: Duration,
}

impl InMemoryStore {
    pub fn new(config: InMemoryStoreConfig) -> Self {
        Self {
            values: DashMap::with_shard_amount(config.shard_count),
            purge_interval: config.purge_interval,
        }
    }

    /// Start the periodic purge. The task holds a weak reference and ends on
    /// [`PurgeHandle::stop`] or once the store is dropped. Returns `None` when
    /// the configured interval is zero.
    pub fn spawn_purger(self: &Arc<Self>) -> Option<PurgeHandle> {
        let period = self.purge_interval;
        if period.is_zero() {
            warn!("In-memory purge disabled, expired values are only dropped on access");
            return None;
        }

        let store: Weak<Self> = Arc::downgrade(self);
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(store) = store.upgrade() else { break };
                        store.purge_expired();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("In-memory purge task stopped");
        });

        info!(interval_ms = period.as_millis() as u64, "In-memory purge task started");
        Some(PurgeHandle { shutdown, handle })
    }

    /// Number of values held, including any not yet purged.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every expired value. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.values.len();
        self.values.retain(|_, v| !v.is_expired(now));
        let purged = before.saturating_sub(self.values.len());
        if purged > 0 {
            debug!(purged, "Purged expired values from in-memory store");
        }
        purged
    }
}

/// Handle to the background purge of an [`InMemoryStore`].
pub struct PurgeHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PurgeHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "In-memory purge task panicked");
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(InMemoryStoreConfig::default())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        if let Some(value) = self.values.get(key) {
            if !value.is_expired(now) {
                return Ok(Some(value.data.clone()));
            }
        } else {
            return Ok(None);
        }
        self.values.remove_if(key, |_, v| v.is_expired(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CachetError::validation(format!("TTL out of range: {:?}", ttl)))?;
        self.values.insert(
            key.to_string(),
            StoredValue {
                data: value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.values.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .values
            .get(key)
            .map(|v| !v.is_expired(now))
            .unwrap_or(false))
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Redis Store
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration for the Redis store.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL
    pub url: String,

    /// Prefix applied to every key written by this store
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "cachet:".to_string(),
        }
    }
}

/// Redis-backed store. The connection manager reconnects transparently.
pub struct RedisStore {
    conn: ConnectionManager,
    config: RedisStoreConfig,
}

impl RedisStore {
    /// Connect and verify the server answers PING.
    pub async fn connect(config: RedisStoreConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            CachetError::with_internal(
                ErrorCode::StoreConnectionFailed,
                "Failed to create Redis client",
                e.to_string(),
            )
        })?;

        let mut conn = ConnectionManager::new(client).await.map_err(|e| {
            CachetError::with_internal(
                ErrorCode::StoreConnectionFailed,
                "Failed to connect to Redis",
                e.to_string(),
            )
        })?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await.map_err(|e| {
            CachetError::with_internal(
                ErrorCode::StoreConnectionFailed,
                "Redis ping failed",
                e.to_string(),
            )
        })?;

        info!(url = %config.url, prefix = %config.key_prefix, "Redis store connected");

        Ok(Self { conn, config })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let data: Option<Vec<u8>> = conn.get(self.full_key(key)).await?;
        Ok(data)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // EX 0 is rejected by the server.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(self.full_key(key), value, seconds)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(self.full_key(key)).await?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(self.full_key(key)).await?;
        Ok(exists)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_set_get_delete() {
        let store = InMemoryStore::default();

        store
            .set("user:1", b"alice".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("user:1").await.unwrap(), Some(b"alice".to_vec()));
        assert!(store.exists("user:1").await.unwrap());

        assert!(store.delete("user:1").await.unwrap());
        assert!(!store.delete("user:1").await.unwrap());
        assert_eq!(store.get("user:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_expiry_is_lazy() {
        let store = InMemoryStore::default();
        store
            .set("short", vec![1, 2, 3], Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(!store.exists("short").await.unwrap());
        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_values() {
        let store = InMemoryStore::default();
        store
            .set("gone", vec![0], Duration::from_millis(5))
            .await
            .unwrap();
        store
            .set("kept", vec![1], Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.exists("kept").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let store = InMemoryStore::default();
        let ttl = Duration::from_secs(60);
        store.set("k", b"one".to_vec(), ttl).await.unwrap();
        store.set("k", b"two".to_vec(), ttl).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_usable_from_sync_code() {
        let store = InMemoryStore::default();
        tokio_test::block_on(async {
            tokio_test::assert_ok!(store.set("sync", vec![7], Duration::from_secs(1)).await);
            assert_eq!(tokio_test::assert_ok!(store.get("sync").await), Some(vec![7]));
        });
        assert_eq!(store.name(), "in_memory");
    }

    #[tokio::test]
    async fn test_purger_drops_unread_expired_values() {
        let store = Arc::new(InMemoryStore::new(InMemoryStoreConfig {
            purge_interval: Duration::from_millis(20),
            ..Default::default()
        }));
        for i in 0..100 {
            store
                .set(&format!("k{}", i), vec![0], Duration::from_millis(1))
                .await
                .unwrap();
        }
        store
            .set("kept", vec![1], Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.len(), 101);

        let purger = store.spawn_purger().unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(store.len(), 1);
        assert!(store.exists("kept").await.unwrap());
        purger.stop().await;
    }

    #[tokio::test]
    async fn test_zero_purge_interval_spawns_nothing() {
        let store = Arc::new(InMemoryStore::new(InMemoryStoreConfig {
            purge_interval: Duration::ZERO,
            ..Default::default()
        }));
        assert!(store.spawn_purger().is_none());
    }
}
