//! Invalidation primitives.
//!
//! - Wildcard key patterns (`*` only, every other character literal)
//! - Invalidation events, published on a local broadcast channel
//! - A bounded log of recent invalidations for the admin surface

use crate::error::{CachetError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::debug;

/// Upper bound on the compiled size of a key pattern.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

// ═══════════════════════════════════════════════════════════════════════════════
// Key Patterns
// ═══════════════════════════════════════════════════════════════════════════════

/// A compiled wildcard pattern matched against whole fully-qualified keys.
///
/// `*` matches any substring, including the empty one. Regex metacharacters
/// in the literal portions are escaped, so `user.1*` matches `user.1:x` but
/// not `userX1:x`.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let translated = wildcard_to_regex(pattern);
        let regex = RegexBuilder::new(&translated)
            .dot_matches_new_line(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| CachetError::invalid_pattern(pattern, e.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

/// Translate a wildcard pattern into an anchored regex, one literal run at a
/// time.
fn wildcard_to_regex(pattern: &str) -> String {
    let mut translated = String::with_capacity(pattern.len() * 2 + 2);
    translated.push('^');
    for (i, literal) in pattern.split('*').enumerate() {
        if i > 0 {
            translated.push_str(".*");
        }
        translated.push_str(&regex::escape(literal));
    }
    translated.push('$');
    translated
}

// ═══════════════════════════════════════════════════════════════════════════════
// Invalidation Events
// ═══════════════════════════════════════════════════════════════════════════════

/// What triggered an invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvalidationEvent {
    /// A single key was deleted
    Key { key: String },

    /// Keys carrying any of these tags were deleted
    Tags { tags: Vec<String> },

    /// Keys matching a wildcard pattern were deleted
    Pattern { pattern: String },

    /// Every key in a namespace was deleted
    Namespace { namespace: String },

    /// The maintenance sweep dropped metadata for elapsed entries
    Sweep,
}

impl InvalidationEvent {
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key { key: key.into() }
    }

    pub fn tags(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Tags {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
        }
    }

    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self::Namespace {
            namespace: namespace.into(),
        }
    }

    /// Metrics label for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Key { .. } => "key",
            Self::Tags { .. } => "tag",
            Self::Pattern { .. } => "pattern",
            Self::Namespace { .. } => "namespace",
            Self::Sweep => "sweep",
        }
    }
}

/// An applied invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationRecord {
    pub event: InvalidationEvent,

    /// Keys removed
    pub count: usize,

    pub timestamp: DateTime<Utc>,

    pub duration_ms: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Invalidation Bus
// ═══════════════════════════════════════════════════════════════════════════════

/// Local fan-out of invalidation records.
///
/// Subscribers see every record published after they subscribed. Nothing
/// leaves the process; a bridge to a message broker would subscribe here.
pub struct InvalidationBus {
    sender: broadcast::Sender<InvalidationRecord>,
    log: Mutex<VecDeque<InvalidationRecord>>,
    log_capacity: usize,
}

impl InvalidationBus {
    pub fn new(channel_capacity: usize, log_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            sender,
            log: Mutex::new(VecDeque::with_capacity(log_capacity)),
            log_capacity,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationRecord> {
        self.sender.subscribe()
    }

    pub fn publish(&self, record: InvalidationRecord) {
        debug!(
            event_type = record.event.event_type(),
            count = record.count,
            "Invalidation applied locally; no cross-instance broadcast configured"
        );

        if self.log_capacity > 0 {
            let mut log = self.log.lock();
            if log.len() == self.log_capacity {
                log.pop_front();
            }
            log.push_back(record.clone());
        }

        // No receivers is fine.
        let _ = self.sender.send(record);
    }

    /// Most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<InvalidationRecord> {
        self.log.lock().iter().rev().take(limit).cloned().collect()
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new(1024, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn record(event: InvalidationEvent, count: usize) -> InvalidationRecord {
        InvalidationRecord {
            event,
            count,
            timestamp: Utc::now(),
            duration_ms: 0,
        }
    }

    #[test]
    fn test_wildcard_translation() {
        assert_eq!(wildcard_to_regex("user:*"), "^user:.*$");
        assert_eq!(wildcard_to_regex("*"), "^.*$");
        assert_eq!(wildcard_to_regex("a.b"), r"^a\.b$");
    }

    #[test]
    fn test_pattern_matches_whole_key() {
        let pattern = KeyPattern::compile("user:*").unwrap();
        assert!(pattern.is_match("user:42"));
        assert!(pattern.is_match("user:"));
        assert!(!pattern.is_match("tenant:user:42"));
    }

    #[test]
    fn test_star_in_the_middle() {
        let pattern = KeyPattern::compile("acme:*:profile").unwrap();
        assert!(pattern.is_match("acme:user:42:profile"));
        assert!(!pattern.is_match("acme:user:42:settings"));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let dotted = KeyPattern::compile("report.2024*").unwrap();
        assert!(dotted.is_match("report.2024-01"));
        assert!(!dotted.is_match("reportX2024-01"));

        let bracketed = KeyPattern::compile("list[0]").unwrap();
        assert!(bracketed.is_match("list[0]"));
        assert!(!bracketed.is_match("list0"));

        let alternation = KeyPattern::compile("a|b").unwrap();
        assert!(!alternation.is_match("a"));
        assert!(alternation.is_match("a|b"));
    }

    #[test]
    fn test_unbalanced_input_still_compiles() {
        for raw in ["user:(", "[", "\\", "(*", "{1,"] {
            assert!(KeyPattern::compile(raw).is_ok(), "pattern {raw} should compile");
        }
    }

    #[test]
    fn test_oversized_pattern_is_rejected() {
        let huge = "x*".repeat(50_000);
        let err = KeyPattern::compile(&huge).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPattern);
    }

    #[test]
    fn test_event_serialization() {
        let event = InvalidationEvent::tags(["users"]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tags");
        assert_eq!(json["tags"][0], "users");
        assert_eq!(event.event_type(), "tag");
    }

    #[tokio::test]
    async fn test_bus_delivers_to_subscribers() {
        let bus = InvalidationBus::default();
        let mut rx = bus.subscribe();

        bus.publish(record(InvalidationEvent::pattern("user:*"), 3));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.count, 3);
        assert_eq!(received.event, InvalidationEvent::pattern("user:*"));
    }

    #[test]
    fn test_bus_log_is_bounded() {
        let bus = InvalidationBus::new(8, 2);
        bus.publish(record(InvalidationEvent::key("a"), 1));
        bus.publish(record(InvalidationEvent::key("b"), 1));
        bus.publish(record(InvalidationEvent::key("c"), 1));

        let recent = bus.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event, InvalidationEvent::key("c"));
        assert_eq!(recent[1].event, InvalidationEvent::key("b"));
    }
}
