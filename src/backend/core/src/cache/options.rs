//! Per-call options for engine operations.

use super::key::qualify;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options accepted by reads and writes. Every field is optional; the engine
/// fills gaps from its [`CacheConfig`](super::CacheConfig).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Time-to-live; the configured default (300 s) when unset
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,

    /// Tags the key is filed under
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Force compression regardless of payload size
    #[serde(default)]
    pub compress: bool,

    /// Pass values through serde_json. When false, string values are stored
    /// as their raw bytes and read back verbatim.
    #[serde(default = "default_serialize")]
    pub serialize: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Replace the key's tag set instead of adding to it
    #[serde(default)]
    pub replace_tags: bool,
}

fn default_serialize() -> bool {
    true
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            tags: Vec::new(),
            compress: false,
            serialize: true,
            namespace: None,
            replace_tags: false,
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn ttl_secs(self, seconds: u64) -> Self {
        self.ttl(Duration::from_secs(seconds))
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn serialize(mut self, serialize: bool) -> Self {
        self.serialize = serialize;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn replace_tags(mut self, replace: bool) -> Self {
        self.replace_tags = replace;
        self
    }

    /// Fully-qualified form of `key` under these options.
    pub fn qualify(&self, key: &str) -> String {
        qualify(key, self.namespace.as_deref())
    }

    pub fn ttl_or(&self, default: Duration) -> Duration {
        self.ttl.unwrap_or(default)
    }
}
