//! Key metadata and tag index.
//!
//! Both maps live in one [`CacheIndex`] so every mutation updates them
//! together. The engine keeps the index behind a single mutex; nothing in
//! here awaits.

use super::invalidation::KeyPattern;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

// ═══════════════════════════════════════════════════════════════════════════════
// Entry Metadata
// ═══════════════════════════════════════════════════════════════════════════════

/// What the engine believes about one live key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Fully-qualified key
    pub key: String,

    pub tags: BTreeSet<String>,

    /// Length of the stored payload, after compression
    pub size_bytes: u64,

    /// TTL supplied on the most recent write
    pub ttl_seconds: u64,

    /// First write; kept across overwrites
    pub created_at: DateTime<Utc>,

    /// Last successful read, or the last write
    pub last_accessed: DateTime<Utc>,

    /// Successful reads; kept across overwrites
    pub access_count: u64,
}

impl EntryMetadata {
    /// `created_at + ttl_seconds`. Overwrites keep `created_at`, so a key
    /// rewritten within its TTL still expires one TTL after its first write.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        ChronoDuration::try_seconds(ttl)
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}

/// Parameters of one write, as recorded in the index.
#[derive(Debug, Clone)]
pub struct WriteRecord<'a> {
    pub key: &'a str,
    pub tags: &'a [String],
    pub size_bytes: u64,
    pub ttl_seconds: u64,
    pub replace_tags: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Cache Index
// ═══════════════════════════════════════════════════════════════════════════════

/// Key metadata plus the reverse tag index.
///
/// Invariant: `k ∈ tags[t]` iff `entries[k].tags` contains `t`, and no tag
/// bucket is empty.
#[derive(Debug, Default)]
pub struct CacheIndex {
    entries: HashMap<String, EntryMetadata>,
    tags: HashMap<String, HashSet<String>>,
    memory_bytes: u64,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of `size_bytes` over tracked keys.
    pub fn memory_usage(&self) -> u64 {
        self.memory_bytes
    }

    pub fn get(&self, key: &str) -> Option<&EntryMetadata> {
        self.entries.get(key)
    }

    /// Record a write. Creation time and access count survive an overwrite;
    /// tags accumulate unless `replace_tags` is set.
    pub fn record_write(&mut self, write: WriteRecord<'_>, now: DateTime<Utc>) {
        let previous_tags = match self.entries.get_mut(write.key) {
            Some(entry) => {
                self.memory_bytes = self.memory_bytes.saturating_sub(entry.size_bytes);
                entry.size_bytes = write.size_bytes;
                entry.ttl_seconds = write.ttl_seconds;
                entry.last_accessed = now;
                if write.replace_tags {
                    std::mem::take(&mut entry.tags)
                } else {
                    BTreeSet::new()
                }
            }
            None => {
                self.entries.insert(
                    write.key.to_string(),
                    EntryMetadata {
                        key: write.key.to_string(),
                        tags: BTreeSet::new(),
                        size_bytes: write.size_bytes,
                        ttl_seconds: write.ttl_seconds,
                        created_at: now,
                        last_accessed: now,
                        access_count: 0,
                    },
                );
                BTreeSet::new()
            }
        };
        self.memory_bytes = self.memory_bytes.saturating_add(write.size_bytes);

        for tag in previous_tags {
            if !write.tags.contains(&tag) {
                self.unlink_tag(&tag, write.key);
            }
        }

        if let Some(entry) = self.entries.get_mut(write.key) {
            for tag in write.tags {
                entry.tags.insert(tag.clone());
                self.tags
                    .entry(tag.clone())
                    .or_default()
                    .insert(write.key.to_string());
            }
        }
    }

    /// Record a successful read. Returns false when the key is untracked.
    pub fn record_access(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = now;
                entry.access_count += 1;
                true
            }
            None => false,
        }
    }

    /// Drop a key and every tag membership it holds.
    pub fn remove(&mut self, key: &str) -> Option<EntryMetadata> {
        let entry = self.entries.remove(key)?;
        self.memory_bytes = self.memory_bytes.saturating_sub(entry.size_bytes);
        for tag in &entry.tags {
            self.unlink_tag(tag, key);
        }
        Some(entry)
    }

    fn unlink_tag(&mut self, tag: &str, key: &str) {
        if let Some(bucket) = self.tags.get_mut(tag) {
            bucket.remove(key);
            if bucket.is_empty() {
                self.tags.remove(tag);
            }
        }
    }

    /// Keys carrying any of `tags`, each listed once.
    pub fn keys_for_tags(&self, tags: &[String]) -> Vec<String> {
        let mut keys: BTreeSet<&String> = BTreeSet::new();
        for tag in tags {
            if let Some(bucket) = self.tags.get(tag) {
                keys.extend(bucket.iter());
            }
        }
        keys.into_iter().cloned().collect()
    }

    /// Keys filed under `tag`, sorted.
    pub fn keys_by_tag(&self, tag: &str) -> Vec<String> {
        self.keys_for_tags(std::slice::from_ref(&tag.to_string()))
    }

    pub fn keys_matching(&self, pattern: &KeyPattern) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .keys()
            .filter(|k| pattern.is_match(k))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// The `limit` most-read entries, highest `access_count` first.
    pub fn top_by_access(&self, limit: usize) -> Vec<EntryMetadata> {
        let mut entries: Vec<&EntryMetadata> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| a.key.cmp(&b.key))
        });
        entries.into_iter().take(limit).cloned().collect()
    }

    /// Remove every entry whose TTL has elapsed since creation. Returns the
    /// removed keys.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.is_expired_at(now))
            .map(|e| e.key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired
    }

    /// Number of distinct tags with at least one key.
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Check the tag/metadata invariant in both directions.
    pub fn is_consistent(&self) -> bool {
        let forward = self.entries.values().all(|entry| {
            entry.tags.iter().all(|tag| {
                self.tags
                    .get(tag)
                    .map(|bucket| bucket.contains(&entry.key))
                    .unwrap_or(false)
            })
        });
        let backward = self.tags.iter().all(|(tag, bucket)| {
            !bucket.is_empty()
                && bucket.iter().all(|key| {
                    self.entries
                        .get(key)
                        .map(|entry| entry.tags.contains(tag))
                        .unwrap_or(false)
                })
        });
        let memory = self.entries.values().map(|e| e.size_bytes).sum::<u64>() == self.memory_bytes;
        forward && backward && memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write<'a>(key: &'a str, tags: &'a [String], size: u64) -> WriteRecord<'a> {
        WriteRecord {
            key,
            tags,
            size_bytes: size,
            ttl_seconds: 300,
            replace_tags: false,
        }
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_write_creates_metadata_and_tags() {
        let mut index = CacheIndex::new();
        let now = Utc::now();
        let t = tags(&["users", "admins"]);
        index.record_write(write("user:1", &t, 10), now);

        let entry = index.get("user:1").unwrap();
        assert_eq!(entry.created_at, now);
        assert_eq!(entry.access_count, 0);
        assert_eq!(index.keys_by_tag("users"), vec!["user:1"]);
        assert_eq!(index.memory_usage(), 10);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_overwrite_preserves_created_at_and_access_count() {
        let mut index = CacheIndex::new();
        let t0 = Utc::now();
        let t1 = t0 + ChronoDuration::seconds(5);
        let t2 = t0 + ChronoDuration::seconds(10);

        index.record_write(write("k", &[], 10), t0);
        assert!(index.record_access("k", t1));
        index.record_write(write("k", &[], 25), t2);

        let entry = index.get("k").unwrap();
        assert_eq!(entry.created_at, t0);
        assert_eq!(entry.last_accessed, t2);
        assert_eq!(entry.access_count, 1);
        assert_eq!(entry.size_bytes, 25);
        assert_eq!(index.memory_usage(), 25);
    }

    #[test]
    fn test_tags_accumulate_across_writes() {
        let mut index = CacheIndex::new();
        let now = Utc::now();
        index.record_write(write("k", &tags(&["a"]), 1), now);
        index.record_write(write("k", &tags(&["b"]), 1), now);

        let entry = index.get("k").unwrap();
        assert_eq!(entry.tags.len(), 2);
        assert_eq!(index.keys_by_tag("a"), vec!["k"]);
        assert_eq!(index.keys_by_tag("b"), vec!["k"]);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_replace_tags_drops_old_memberships() {
        let mut index = CacheIndex::new();
        let now = Utc::now();
        index.record_write(write("k", &tags(&["a", "shared"]), 1), now);

        let new_tags = tags(&["b", "shared"]);
        let mut replacing = write("k", &new_tags, 1);
        replacing.replace_tags = true;
        index.record_write(replacing, now);

        assert!(index.keys_by_tag("a").is_empty());
        assert_eq!(index.keys_by_tag("b"), vec!["k"]);
        assert_eq!(index.keys_by_tag("shared"), vec!["k"]);
        assert_eq!(index.tag_count(), 2);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_remove_prunes_empty_buckets() {
        let mut index = CacheIndex::new();
        let now = Utc::now();
        let t = tags(&["solo", "pair"]);
        index.record_write(write("k1", &t, 4), now);
        index.record_write(write("k2", &tags(&["pair"]), 6), now);

        let removed = index.remove("k1").unwrap();
        assert_eq!(removed.key, "k1");
        assert_eq!(index.tag_count(), 1);
        assert_eq!(index.keys_by_tag("pair"), vec!["k2"]);
        assert_eq!(index.memory_usage(), 6);
        assert!(index.remove("k1").is_none());
        assert!(index.is_consistent());
    }

    #[test]
    fn test_keys_for_tags_is_a_deduplicated_union() {
        let mut index = CacheIndex::new();
        let now = Utc::now();
        index.record_write(write("k1", &tags(&["a", "b"]), 1), now);
        index.record_write(write("k2", &tags(&["b"]), 1), now);
        index.record_write(write("k3", &tags(&["c"]), 1), now);

        let keys = index.keys_for_tags(&tags(&["a", "b", "missing"]));
        assert_eq!(keys, vec!["k1", "k2"]);
    }

    #[test]
    fn test_top_by_access_orders_descending() {
        let mut index = CacheIndex::new();
        let now = Utc::now();
        for key in ["a", "b", "c"] {
            index.record_write(write(key, &[], 1), now);
        }
        for _ in 0..3 {
            index.record_access("b", now);
        }
        index.record_access("c", now);

        let top: Vec<String> = index.top_by_access(2).into_iter().map(|e| e.key).collect();
        assert_eq!(top, vec!["b", "c"]);
    }

    #[test]
    fn test_sweep_removes_only_elapsed_entries() {
        let mut index = CacheIndex::new();
        let t0 = Utc::now();
        let mut short = write("short", &[], 1);
        short.ttl_seconds = 5;
        let t = tags(&["t"]);
        let mut short_tagged = write("short-tagged", &t, 1);
        short_tagged.ttl_seconds = 5;
        index.record_write(short, t0);
        index.record_write(short_tagged, t0);
        index.record_write(write("long", &[], 1), t0);

        // Exactly at expiry is not yet expired.
        assert!(index.sweep_expired(t0 + ChronoDuration::seconds(5)).is_empty());

        let mut swept = index.sweep_expired(t0 + ChronoDuration::seconds(6));
        swept.sort();
        assert_eq!(swept, vec!["short", "short-tagged"]);
        assert!(index.get("long").is_some());
        assert_eq!(index.tag_count(), 0);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_rewrites_do_not_extend_sweep_deadline() {
        let mut index = CacheIndex::new();
        let t0 = Utc::now();
        let mut first = write("hot", &[], 1);
        first.ttl_seconds = 10;
        index.record_write(first, t0);

        let mut rewrite = write("hot", &[], 1);
        rewrite.ttl_seconds = 10;
        index.record_write(rewrite, t0 + ChronoDuration::seconds(8));

        assert_eq!(index.get("hot").unwrap().expires_at(), t0 + ChronoDuration::seconds(10));
        assert_eq!(index.sweep_expired(t0 + ChronoDuration::seconds(11)), vec!["hot"]);
    }

    #[test]
    fn test_prefix_and_pattern_scans() {
        let mut index = CacheIndex::new();
        let now = Utc::now();
        for key in ["ns1:a", "ns1:b", "ns10:a", "user:1"] {
            index.record_write(write(key, &[], 1), now);
        }
        assert_eq!(index.keys_with_prefix("ns1:"), vec!["ns1:a", "ns1:b"]);

        let pattern = KeyPattern::compile("ns1*:a").unwrap();
        assert_eq!(index.keys_matching(&pattern), vec!["ns1:a", "ns10:a"]);
    }
}
