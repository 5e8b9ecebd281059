//! The cache engine.
//!
//! [`CacheEngine`] owns the store handle, the payload codec, the metadata and
//! tag index, the statistics counters and the invalidation bus. Store calls
//! are best effort: failures and timeouts are logged, reads degrade to misses
//! and writes still update bookkeeping. The index mutex is only ever held for
//! synchronous work between awaits.

use super::codec::{is_compressed, Lz4Codec, PayloadCodec};
use super::index::{CacheIndex, EntryMetadata, WriteRecord};
use super::invalidation::{InvalidationBus, InvalidationEvent, InvalidationRecord, KeyPattern};
use super::key::{namespace_prefix, qualify};
use super::options::CacheOptions;
use super::stats::{CacheStats, StatsCounters};
use super::store::{InMemoryStore, KeyValueStore};
use super::CacheConfig;
use crate::error::{CachetError, ErrorCode, Result};
use crate::health::{assess, HealthReport, ProbeOutcome};
use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture, FutureExt};
use metrics::{counter, gauge, histogram};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// TTL of the health probe's sentinel key.
const PROBE_TTL: Duration = Duration::from_secs(1);

const PROBE_KEY_PREFIX: &str = "__cachet_health__";

// ═══════════════════════════════════════════════════════════════════════════════
// Batch and Warming Inputs
// ═══════════════════════════════════════════════════════════════════════════════

/// One write of an `mset` call.
#[derive(Debug, Clone)]
pub struct BatchEntry<T> {
    pub key: String,
    pub value: T,
    pub options: CacheOptions,
}

impl<T> BatchEntry<T> {
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
            options: CacheOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }
}

type WarmFactory = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<Value>> + Send>;

/// A key to pre-populate, with the factory that produces its value.
pub struct WarmEntry {
    pub key: String,
    pub options: CacheOptions,
    factory: WarmFactory,
}

impl WarmEntry {
    pub fn new<F, Fut>(key: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            key: key.into(),
            options: CacheOptions::default(),
            factory: Box::new(move || factory().boxed()),
        }
    }

    /// An entry whose value is already known.
    pub fn value(key: impl Into<String>, value: Value) -> Self {
        Self::new(key, move || async move { Ok::<_, anyhow::Error>(value) })
    }

    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }
}

impl std::fmt::Debug for WarmEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarmEntry")
            .field("key", &self.key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Outcome of a `warm_cache` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmSummary {
    pub warmed: usize,
    pub failed: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Cache Engine
// ═══════════════════════════════════════════════════════════════════════════════

/// Tag-indexed, namespace-aware cache-aside engine.
///
/// Share it as `Arc<CacheEngine>`; every method takes `&self`.
pub struct CacheEngine {
    store: Arc<dyn KeyValueStore>,
    codec: PayloadCodec,
    config: CacheConfig,
    index: Mutex<CacheIndex>,
    stats: StatsCounters,
    bus: InvalidationBus,
}

impl CacheEngine {
    /// Create an engine with the LZ4 codec.
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        let codec = PayloadCodec::new(
            Arc::new(Lz4Codec::new()),
            config.compression_threshold,
            config.enable_compression,
        );
        Self::with_codec(store, config, codec)
    }

    pub fn with_codec(store: Arc<dyn KeyValueStore>, config: CacheConfig, codec: PayloadCodec) -> Self {
        let bus = InvalidationBus::new(
            config.event_channel_capacity,
            config.invalidation_log_capacity,
        );
        info!(
            store = store.name(),
            codec = codec.codec_name(),
            default_ttl_secs = config.default_ttl.as_secs(),
            compression_threshold = config.compression_threshold,
            "Cache engine created"
        );
        Self {
            store,
            codec,
            config,
            index: Mutex::new(CacheIndex::new()),
            stats: StatsCounters::new(),
            bus,
        }
    }

    /// Engine over a fresh [`InMemoryStore`] with default configuration.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::default()), CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Store Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one store call under the operation timeout.
    async fn call_store<T, F>(&self, operation: &'static str, key: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.config.operation_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CachetError::store_timeout(operation, key)),
        };
        histogram!("cache_store_duration_seconds", "operation" => operation)
            .record(started.elapsed().as_secs_f64());

        if let Err(e) = &outcome {
            counter!("cache_store_errors_total", "operation" => operation).increment(1);
            warn!(
                operation,
                key,
                store = self.store.name(),
                error = %e,
                "Store call failed"
            );
        }
        outcome
    }

    async fn store_get(&self, key: &str) -> Option<Vec<u8>> {
        self.call_store("get", key, self.store.get(key))
            .await
            .ok()
            .flatten()
    }

    async fn store_set(&self, key: &str, payload: Vec<u8>, ttl: Duration) {
        let _ = self
            .call_store("set", key, self.store.set(key, payload, ttl))
            .await;
    }

    async fn store_delete(&self, key: &str) -> bool {
        self.call_store("delete", key, self.store.delete(key))
            .await
            .unwrap_or(false)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Read and decode a value. Misses, store failures and values that cannot
    /// be read as `T` all come back as `None`.
    #[instrument(skip(self, options), fields(namespace = ?options.namespace))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str, options: &CacheOptions) -> Option<T> {
        let bytes = self.get_raw(key, options).await?;
        decode_value(&options.qualify(key), bytes, options.serialize)
    }

    /// Read the stored bytes with the compression marker removed.
    #[instrument(skip(self, options), fields(namespace = ?options.namespace))]
    pub async fn get_raw(&self, key: &str, options: &CacheOptions) -> Option<Vec<u8>> {
        let full_key = options.qualify(key);

        let Some(payload) = self.store_get(&full_key).await else {
            self.stats.record_miss();
            counter!("cache_misses_total").increment(1);
            debug!(key = %full_key, "Cache miss");
            return None;
        };

        self.stats.record_hit();
        counter!("cache_hits_total").increment(1);
        self.index.lock().record_access(&full_key, Utc::now());
        debug!(key = %full_key, bytes = payload.len(), "Cache hit");

        Some(self.decode_payload(&full_key, payload))
    }

    fn decode_payload(&self, key: &str, payload: Vec<u8>) -> Vec<u8> {
        if !is_compressed(&payload) {
            return payload;
        }
        match self.codec.decode(payload.clone()) {
            Ok(decoded) => decoded,
            Err(e) => {
                counter!("cache_decode_errors_total", "stage" => "decompress").increment(1);
                warn!(key, error = %e, "Decompression failed, returning stored bytes");
                payload
            }
        }
    }

    /// Read many keys concurrently. Results line up with `keys`.
    #[instrument(skip_all, fields(count = keys.len()))]
    pub async fn mget<T, K>(&self, keys: &[K], options: &CacheOptions) -> Vec<Option<T>>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
    {
        join_all(keys.iter().map(|key| self.get(key.as_ref(), options))).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Serialize and write a value.
    ///
    /// Only a value that cannot be serialized is an error; store failures are
    /// logged and the index is updated regardless.
    #[instrument(skip(self, value, options), fields(namespace = ?options.namespace))]
    pub async fn set<T>(&self, key: &str, value: &T, options: &CacheOptions) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes = encode_value(value, options.serialize)?;
        self.set_raw(key, bytes, options).await;
        Ok(())
    }

    /// Write bytes as they are, applying the compression policy.
    #[instrument(skip(self, bytes, options), fields(namespace = ?options.namespace, bytes = bytes.len()))]
    pub async fn set_raw(&self, key: &str, bytes: Vec<u8>, options: &CacheOptions) {
        let full_key = options.qualify(key);
        let ttl = options.ttl_or(self.config.default_ttl);
        let payload = self.codec.encode(bytes, options.compress);
        let size_bytes = payload.len() as u64;

        self.store_set(&full_key, payload, ttl).await;

        self.index.lock().record_write(
            WriteRecord {
                key: &full_key,
                tags: &options.tags,
                size_bytes,
                ttl_seconds: ttl.as_secs(),
                replace_tags: options.replace_tags,
            },
            Utc::now(),
        );
        self.stats.record_set();
        counter!("cache_sets_total").increment(1);
        debug!(key = %full_key, size_bytes, ttl_secs = ttl.as_secs(), "Cache set");
    }

    /// Write many entries concurrently. Returns how many were written; an
    /// entry that fails to serialize does not stop the others.
    #[instrument(skip_all, fields(count = entries.len()))]
    pub async fn mset<T: Serialize>(&self, entries: &[BatchEntry<T>]) -> usize {
        let results = join_all(
            entries
                .iter()
                .map(|entry| self.set(&entry.key, &entry.value, &entry.options)),
        )
        .await;

        results
            .into_iter()
            .zip(entries)
            .filter(|(result, entry)| match result {
                Ok(()) => true,
                Err(e) => {
                    warn!(key = %entry.key, error = %e, "Batch write skipped");
                    false
                }
            })
            .count()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deletes
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove one key. Deleting an absent key is a no-op that still counts.
    /// Returns whether the store or the index knew the key.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str, namespace: Option<&str>) -> bool {
        let started = Instant::now();
        let full_key = qualify(key, namespace);
        let removed = self.delete_qualified(&full_key).await;
        self.publish(InvalidationEvent::key(&full_key), usize::from(removed), started);
        removed
    }

    /// Delete many keys concurrently. Returns how many existed.
    #[instrument(skip_all, fields(count = keys.len()))]
    pub async fn mdel<K: AsRef<str>>(&self, keys: &[K], namespace: Option<&str>) -> usize {
        join_all(keys.iter().map(|key| self.delete(key.as_ref(), namespace)))
            .await
            .into_iter()
            .filter(|removed| *removed)
            .count()
    }

    async fn delete_qualified(&self, full_key: &str) -> bool {
        let deleted = self.store_delete(full_key).await;
        let tracked = self.index.lock().remove(full_key).is_some();
        self.stats.record_delete();
        counter!("cache_deletes_total").increment(1);
        deleted || tracked
    }

    async fn delete_all(&self, keys: &[String]) {
        join_all(keys.iter().map(|key| self.delete_qualified(key))).await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cache-Aside
    // ─────────────────────────────────────────────────────────────────────────

    /// Return the cached value, or run `factory`, cache its result and return
    /// it. Concurrent misses on the same key each run the factory.
    #[instrument(skip(self, factory, options), fields(namespace = ?options.namespace))]
    pub async fn get_or_set<T, F, Fut, E>(
        &self,
        key: &str,
        factory: F,
        options: &CacheOptions,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(value) = self.get(key, options).await {
            return Ok(value);
        }

        let value = factory().await?;
        if let Err(e) = self.set(key, &value, options).await {
            warn!(key, error = %e, "Factory value could not be cached");
        }
        Ok(value)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invalidation
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete every key carrying at least one of `tags`. Returns the number of
    /// keys deleted.
    #[instrument(skip(self))]
    pub async fn invalidate_by_tags(&self, tags: &[String]) -> usize {
        let started = Instant::now();
        let keys = self.index.lock().keys_for_tags(tags);
        self.delete_all(&keys).await;
        self.publish(InvalidationEvent::tags(tags.iter().cloned()), keys.len(), started);
        info!(count = keys.len(), "Invalidated keys by tag");
        keys.len()
    }

    /// Delete every tracked key matching a `*` wildcard pattern.
    #[instrument(skip(self))]
    pub async fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize> {
        let started = Instant::now();
        let compiled = KeyPattern::compile(pattern)?;
        let keys = self.index.lock().keys_matching(&compiled);
        self.delete_all(&keys).await;
        self.publish(InvalidationEvent::pattern(pattern), keys.len(), started);
        info!(count = keys.len(), "Invalidated keys by pattern");
        Ok(keys.len())
    }

    /// Delete every tracked key under `namespace`.
    #[instrument(skip(self))]
    pub async fn clear_namespace(&self, namespace: &str) -> usize {
        let started = Instant::now();
        let keys = self.index.lock().keys_with_prefix(&namespace_prefix(namespace));
        self.delete_all(&keys).await;
        self.publish(InvalidationEvent::namespace(namespace), keys.len(), started);
        info!(count = keys.len(), "Cleared namespace");
        keys.len()
    }

    fn publish(&self, event: InvalidationEvent, count: usize, started: Instant) {
        counter!("cache_invalidations_total", "type" => event.event_type()).increment(1);
        self.bus.publish(InvalidationRecord {
            event,
            count,
            timestamp: Utc::now(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    /// Receive every invalidation applied after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationRecord> {
        self.bus.subscribe()
    }

    /// Most recent invalidations, newest first.
    pub fn recent_invalidations(&self, limit: usize) -> Vec<InvalidationRecord> {
        self.bus.recent(limit)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Warming
    // ─────────────────────────────────────────────────────────────────────────

    /// Run every factory concurrently and cache the results.
    #[instrument(skip_all, fields(count = entries.len()))]
    pub async fn warm_cache(&self, entries: Vec<WarmEntry>) -> WarmSummary {
        let outcomes = join_all(entries.into_iter().map(|entry| async move {
            let WarmEntry {
                key,
                options,
                factory,
            } = entry;
            match factory().await {
                Ok(value) => match self.set(&key, &value, &options).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(key = %key, error = %e, "Warm value could not be cached");
                        false
                    }
                },
                Err(e) => {
                    warn!(key = %key, error = %e, "Warm factory failed");
                    false
                }
            }
        }))
        .await;

        let warmed = outcomes.iter().filter(|ok| **ok).count();
        let summary = WarmSummary {
            warmed,
            failed: outcomes.len() - warmed,
        };
        counter!("cache_warmed_total").increment(summary.warmed as u64);
        info!(warmed = summary.warmed, failed = summary.failed, "Cache warming finished");
        summary
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get_stats(&self) -> CacheStats {
        let (key_count, memory_usage) = {
            let index = self.index.lock();
            (index.len(), index.memory_usage())
        };
        let stats = self.stats.snapshot(key_count, memory_usage);

        gauge!("cache_entries").set(stats.key_count as f64);
        gauge!("cache_memory_bytes").set(stats.memory_usage as f64);
        gauge!("cache_hit_rate").set(stats.hit_rate);
        stats
    }

    pub fn get_key_info(&self, key: &str, namespace: Option<&str>) -> Option<EntryMetadata> {
        self.index.lock().get(&qualify(key, namespace)).cloned()
    }

    /// Like [`get_key_info`](Self::get_key_info), but untracked keys are an
    /// error.
    pub fn require_key_info(&self, key: &str, namespace: Option<&str>) -> Result<EntryMetadata> {
        self.get_key_info(key, namespace)
            .ok_or_else(|| CachetError::key_not_found(qualify(key, namespace)))
    }

    pub fn get_top_keys(&self, limit: usize) -> Vec<EntryMetadata> {
        self.index.lock().top_by_access(limit)
    }

    pub fn get_keys_by_tag(&self, tag: &str) -> Vec<String> {
        self.index.lock().keys_by_tag(tag)
    }

    /// Whether the metadata and tag index agree. Exposed for tests and the
    /// maintenance report.
    pub fn index_is_consistent(&self) -> bool {
        self.index.lock().is_consistent()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Health
    // ─────────────────────────────────────────────────────────────────────────

    /// Probe the store and grade the current statistics.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthReport {
        let probe = self.probe_store().await;
        let report = assess(
            self.get_stats(),
            &self.config.thresholds(),
            probe,
            self.store.name(),
        );
        if !report.status.is_healthy() {
            warn!(status = %report.status, issues = ?report.issues, "Cache health check found issues");
        }
        report
    }

    /// Write, read back and delete a sentinel key directly against the store.
    /// Statistics and the index are left alone.
    async fn probe_store(&self) -> ProbeOutcome {
        let key = format!("{}:{}", PROBE_KEY_PREFIX, Uuid::new_v4());
        let expected = Utc::now().timestamp_millis().to_string().into_bytes();
        let started = Instant::now();

        self.call_store("set", &key, self.store.set(&key, expected.clone(), PROBE_TTL))
            .await
            .map_err(|e| e.to_string())?;
        let read = self
            .call_store("get", &key, self.store.get(&key))
            .await
            .map_err(|e| e.to_string())?;
        self.call_store("delete", &key, self.store.delete(&key))
            .await
            .map_err(|e| e.to_string())?;

        match read {
            Some(value) if value == expected => Ok(started.elapsed()),
            Some(_) => Err("sentinel value mismatch".to_string()),
            None => Err("sentinel value missing after write".to_string()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Drop metadata for entries whose TTL has elapsed since creation.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    /// [`sweep_expired`](Self::sweep_expired) against an explicit clock.
    /// The store is never touched.
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let started = Instant::now();
        let swept = self.index.lock().sweep_expired(now).len();

        counter!("cache_swept_entries_total").increment(swept as u64);
        if swept > 0 {
            self.publish(InvalidationEvent::Sweep, swept, started);
        }
        info!(swept, "Expired metadata swept");
        swept
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Value Encoding
// ═══════════════════════════════════════════════════════════════════════════════

/// Turn a value into stored bytes. With `serialize` off, strings are stored
/// verbatim and anything else still goes through JSON.
fn encode_value<T: Serialize + ?Sized>(value: &T, serialize: bool) -> Result<Vec<u8>> {
    if !serialize {
        if let Value::String(raw) = serde_json::to_value(value)? {
            return Ok(raw.into_bytes());
        }
    }
    serde_json::to_vec(value).map_err(|e| {
        CachetError::with_internal(
            ErrorCode::SerializationError,
            "Failed to serialize value for cache",
            e.to_string(),
        )
    })
}

/// Turn stored bytes back into a value.
///
/// With `serialize` on, JSON is tried first and the bytes read as a string
/// second. With it off the order is reversed, mirroring [`encode_value`]:
/// strings were stored verbatim, everything else as JSON.
fn decode_value<T: DeserializeOwned>(key: &str, bytes: Vec<u8>, serialize: bool) -> Option<T> {
    if serialize {
        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => return Some(value),
            Err(e) => debug!(key, error = %e, "Payload is not JSON of the requested type, trying raw string"),
        }
    }

    let raw = String::from_utf8_lossy(&bytes).into_owned();
    let as_string = serde_json::from_value::<T>(Value::String(raw));
    let outcome = match (as_string, serialize) {
        (Ok(value), _) => Ok(value),
        (Err(_), false) => serde_json::from_slice::<T>(&bytes),
        (Err(e), true) => Err(e),
    };

    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            counter!("cache_decode_errors_total", "stage" => "deserialize").increment(1);
            warn!(key, error = %e, "Cached value could not be decoded");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_value_respects_serialize_flag() {
        assert_eq!(encode_value("hi", true).unwrap(), br#""hi""#.to_vec());
        assert_eq!(encode_value("hi", false).unwrap(), b"hi".to_vec());
        assert_eq!(encode_value(&json!({"a": 1}), false).unwrap(), br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn test_decode_value_falls_back_to_string() {
        let text: Option<String> = decode_value("k", b"not json".to_vec(), true);
        assert_eq!(text.as_deref(), Some("not json"));

        let number: Option<u32> = decode_value("k", b"not json".to_vec(), true);
        assert!(number.is_none());

        let raw: Option<String> = decode_value("k", br#""quoted""#.to_vec(), false);
        assert_eq!(raw.as_deref(), Some(r#""quoted""#));
    }

    #[test]
    fn test_unserialized_non_strings_decode_as_json() {
        let bytes = encode_value(&5, false).unwrap();
        assert_eq!(decode_value::<i32>("k", bytes, false), Some(5));

        let bytes = encode_value(&json!({"a": [1, 2]}), false).unwrap();
        assert_eq!(decode_value::<Value>("k", bytes.clone(), false), Some(json!({"a": [1, 2]})));
        // A string target still gets the raw text.
        assert_eq!(decode_value::<String>("k", bytes, false).as_deref(), Some(r#"{"a":[1,2]}"#));
    }

    #[tokio::test]
    async fn test_get_and_set_round_trip() {
        let engine = CacheEngine::in_memory();
        let opts = CacheOptions::new().tag("users");

        engine.set("user:1", &json!({"name": "Ann"}), &opts).await.unwrap();
        let value: Option<Value> = engine.get("user:1", &opts).await;

        assert_eq!(value, Some(json!({"name": "Ann"})));
        assert_eq!(engine.get_keys_by_tag("users"), vec!["user:1"]);
        let stats = engine.get_stats();
        assert_eq!((stats.hits, stats.misses, stats.sets), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_probe_does_not_touch_stats() {
        let engine = CacheEngine::in_memory();
        let report = engine.health_check().await;

        // Only the unread 0% hit rate is flagged; the probe itself succeeded.
        assert_eq!(report.status, crate::health::HealthStatus::Degraded);
        assert_eq!(report.issues.len(), 1);
        assert!(report.probe_latency_ms.is_some());
        let stats = engine.get_stats();
        assert_eq!(stats.reads(), 0);
        assert_eq!(stats.key_count, 0);
    }

    #[tokio::test]
    async fn test_require_key_info_reports_not_found() {
        let engine = CacheEngine::in_memory();
        let err = engine.require_key_info("ghost", Some("ns")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::KeyNotFound);
    }
}
