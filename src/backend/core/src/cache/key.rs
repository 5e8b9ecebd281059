//! Cache key construction.
//!
//! A fully-qualified key is `namespace:key` when a namespace is supplied and
//! the raw key otherwise. Namespace clearing relies on that `:` separator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between namespace and key, and between key segments.
pub const KEY_SEPARATOR: &str = ":";

/// Qualify a raw key with an optional namespace.
pub fn qualify(key: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("{}{}{}", ns, KEY_SEPARATOR, key),
        None => key.to_string(),
    }
}

/// Prefix shared by every fully-qualified key in `namespace`.
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{}{}", namespace, KEY_SEPARATOR)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Cache Key
// ═══════════════════════════════════════════════════════════════════════════════

/// A raw key paired with its optional namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The string the store and the indices see.
    pub fn qualified(&self) -> String {
        qualify(&self.key, self.namespace.as_deref())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref ns) = self.namespace {
            write!(f, "{}{}", ns, KEY_SEPARATOR)?;
        }
        write!(f, "{}", self.key)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Key Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Joins segments with `:`, e.g. `KeyBuilder::new("user").segment(42)` builds
/// `user:42`.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    segments: Vec<String>,
    namespace: Option<String>,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            segments: vec![prefix.into()],
            namespace: None,
        }
    }

    pub fn segment(mut self, segment: impl fmt::Display) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn build(self) -> CacheKey {
        let key = self.segments.join(KEY_SEPARATOR);
        match self.namespace {
            Some(ns) => CacheKey::new(key).with_namespace(ns),
            None => CacheKey::new(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("x", None), "x");
        assert_eq!(qualify("x", Some("ns1")), "ns1:x");
        assert_eq!(qualify("user:42", Some("tenant")), "tenant:user:42");
    }

    #[test]
    fn test_namespace_prefix_matches_qualified_keys() {
        let prefix = namespace_prefix("ns1");
        assert!(qualify("a", Some("ns1")).starts_with(&prefix));
        assert!(!qualify("a", Some("ns10")).starts_with(&prefix));
    }

    #[test]
    fn test_cache_key_display_matches_qualified() {
        let key = CacheKey::new("user:42").with_namespace("acme");
        assert_eq!(key.to_string(), key.qualified());
        assert_eq!(key.key(), "user:42");
        assert_eq!(key.namespace(), Some("acme"));
    }

    #[test]
    fn test_key_builder() {
        let key = KeyBuilder::new("user").segment(42).segment("profile").build();
        assert_eq!(key.qualified(), "user:42:profile");

        let scoped = KeyBuilder::new("course").segment(7).namespace("tenant-a").build();
        assert_eq!(scoped.qualified(), "tenant-a:course:7");
    }
}
