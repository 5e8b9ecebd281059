//! Health status types and the cache health assessment.
//!
//! # Health Status Semantics
//!
//! - **Healthy**: no issues
//! - **Degraded**: one or two issues; the cache still serves traffic
//! - **Unhealthy**: more than two issues

use crate::cache::CacheStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Health Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Health status of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// More than two issues is unhealthy, one or two is degraded.
    pub fn from_issue_count(issues: usize) -> Self {
        match issues {
            0 => Self::Healthy,
            1 | 2 => Self::Degraded,
            _ => Self::Unhealthy,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Healthy or degraded.
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }

    /// Combine two statuses, returning the worse one.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }

    pub fn to_http_status(&self) -> u16 {
        match self {
            Self::Healthy | Self::Degraded => 200,
            Self::Unhealthy => 503,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Thresholds
// ═══════════════════════════════════════════════════════════════════════════════

/// Limits the health check compares against.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthThresholds {
    /// Hit rate (percent) below which an issue is raised
    pub hit_rate_floor: f64,

    /// Tracked payload bytes above which an issue is raised
    pub memory_ceiling_bytes: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            hit_rate_floor: 50.0,
            memory_ceiling_bytes: 100 * 1024 * 1024,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Issues
// ═══════════════════════════════════════════════════════════════════════════════

/// A single finding from the health check.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthIssue {
    LowHitRate { hit_rate: f64, floor: f64 },
    MemoryCeiling { usage: u64, ceiling: u64 },
    ProbeFailed { reason: String },
}

impl fmt::Display for HealthIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowHitRate { hit_rate, floor } => {
                write!(f, "Low hit rate: {:.2}% (floor {:.0}%)", hit_rate, floor)
            }
            Self::MemoryCeiling { usage, ceiling } => {
                write!(f, "High memory usage: {} bytes (ceiling {} bytes)", usage, ceiling)
            }
            Self::ProbeFailed { reason } => write!(f, "Store round-trip failed: {}", reason),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Health Report
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a cache health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,

    /// Human-readable issue descriptions
    #[serde(default)]
    pub issues: Vec<String>,

    /// Statistics the assessment was based on
    pub stats: CacheStats,

    /// Round-trip probe latency, when the probe succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_latency_ms: Option<u64>,

    /// Store adapter name
    pub store: String,

    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> u16 {
        self.status.to_http_status()
    }

    pub fn is_operational(&self) -> bool {
        self.status.is_operational()
    }
}

/// Outcome of the store round-trip probe.
pub type ProbeOutcome = std::result::Result<Duration, String>;

/// Collect issues from statistics and the probe outcome.
pub fn collect_issues(
    stats: &CacheStats,
    thresholds: &HealthThresholds,
    probe: &ProbeOutcome,
) -> Vec<HealthIssue> {
    let mut issues = Vec::new();

    // No reads yet is a 0% hit rate.
    if stats.hit_rate < thresholds.hit_rate_floor {
        issues.push(HealthIssue::LowHitRate {
            hit_rate: stats.hit_rate,
            floor: thresholds.hit_rate_floor,
        });
    }

    if stats.memory_usage > thresholds.memory_ceiling_bytes {
        issues.push(HealthIssue::MemoryCeiling {
            usage: stats.memory_usage,
            ceiling: thresholds.memory_ceiling_bytes,
        });
    }

    if let Err(reason) = probe {
        issues.push(HealthIssue::ProbeFailed {
            reason: reason.clone(),
        });
    }

    issues
}

/// Build the report for a set of statistics and a probe outcome.
pub fn assess(
    stats: CacheStats,
    thresholds: &HealthThresholds,
    probe: ProbeOutcome,
    store: &str,
) -> HealthReport {
    let issues = collect_issues(&stats, thresholds, &probe);
    HealthReport {
        status: HealthStatus::from_issue_count(issues.len()),
        issues: issues.iter().map(ToString::to_string).collect(),
        stats,
        probe_latency_ms: probe.ok().map(|d| d.as_millis() as u64),
        store: store.to_string(),
        checked_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(hits: u64, misses: u64, memory_usage: u64) -> CacheStats {
        CacheStats {
            hits,
            misses,
            hit_rate: crate::cache::stats::hit_rate(hits, misses),
            memory_usage,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_from_issue_count() {
        assert_eq!(HealthStatus::from_issue_count(0), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_issue_count(1), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_issue_count(2), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_issue_count(3), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_status_combine_and_http() {
        assert_eq!(
            HealthStatus::Healthy.combine(HealthStatus::Degraded),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::Degraded.combine(HealthStatus::Unhealthy),
            HealthStatus::Unhealthy
        );
        assert_eq!(HealthStatus::Degraded.to_http_status(), 200);
        assert_eq!(HealthStatus::Unhealthy.to_http_status(), 503);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }

    #[test]
    fn test_unread_cache_reports_low_hit_rate() {
        let report = assess(
            stats(0, 0, 0),
            &HealthThresholds::default(),
            Ok(Duration::from_millis(1)),
            "in_memory",
        );
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].contains("Low hit rate"));
        assert_eq!(report.probe_latency_ms, Some(1));
    }

    #[test]
    fn test_warm_cache_with_good_hit_rate_is_healthy() {
        let report = assess(
            stats(9, 1, 0),
            &HealthThresholds::default(),
            Ok(Duration::from_millis(1)),
            "in_memory",
        );
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_failed_probe_without_reads_has_two_issues() {
        let issues = collect_issues(
            &stats(0, 0, 0),
            &HealthThresholds::default(),
            &Err("connection refused".to_string()),
        );
        assert_eq!(issues.len(), 2);
        assert_eq!(HealthStatus::from_issue_count(issues.len()), HealthStatus::Degraded);
    }

    #[test]
    fn test_low_hit_rate_degrades() {
        let report = assess(
            stats(1, 3, 0),
            &HealthThresholds::default(),
            Ok(Duration::ZERO),
            "in_memory",
        );
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].contains("Low hit rate"));
    }

    #[test]
    fn test_hit_rate_at_floor_is_fine() {
        let report = assess(
            stats(1, 1, 0),
            &HealthThresholds::default(),
            Ok(Duration::ZERO),
            "in_memory",
        );
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_all_three_issues_are_unhealthy() {
        let thresholds = HealthThresholds {
            memory_ceiling_bytes: 10,
            ..Default::default()
        };
        let report = assess(
            stats(0, 5, 11),
            &thresholds,
            Err("value mismatch".to_string()),
            "redis",
        );
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.issues.len(), 3);
        assert!(report.probe_latency_ms.is_none());
        assert_eq!(report.http_status(), 503);
    }

    #[test]
    fn test_probe_failure_alone_degrades() {
        let issues = collect_issues(
            &stats(10, 0, 0),
            &HealthThresholds::default(),
            &Err("timeout".to_string()),
        );
        assert_eq!(
            issues,
            vec![HealthIssue::ProbeFailed {
                reason: "timeout".to_string()
            }]
        );
    }
}
