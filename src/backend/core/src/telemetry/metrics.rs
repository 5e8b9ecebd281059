//! Prometheus metrics for the cache engine.
//!
//! The engine records through the `metrics` facade; this module installs the
//! Prometheus recorder and describes every series it emits so `/metrics`
//! carries help text.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::collections::HashMap;

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    /// Histogram buckets for store call durations (in seconds)
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,

    /// Global labels to add to all metrics
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            duration_buckets: default_duration_buckets(),
            global_labels: HashMap::new(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_duration_buckets() -> Vec<f64> {
    vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
}

/// Handle to the installed recorder, used to render the scrape body.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prometheus_handle", &self.prometheus_handle.is_some())
            .finish()
    }
}

impl MetricsRegistry {
    /// A registry with no recorder; `render` yields an empty body.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(|h| h.render())
            .unwrap_or_default()
    }
}

/// Install the global Prometheus recorder.
///
/// # Errors
///
/// Returns an error if the buckets are invalid or a recorder is already
/// installed.
pub fn init_metrics(config: &MetricsConfig, service_name: &str) -> anyhow::Result<MetricsRegistry> {
    if !config.enabled {
        return Ok(MetricsRegistry::disabled());
    }

    let mut builder = PrometheusBuilder::new().add_global_label("service", service_name);

    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    builder = builder.set_buckets_for_metric(
        Matcher::Full("cache_store_duration_seconds".to_string()),
        &config.duration_buckets,
    )?;

    let handle = builder.install_recorder()?;

    register_metric_descriptions();

    tracing::info!(service_name = %service_name, "Metrics initialized");

    Ok(MetricsRegistry {
        prometheus_handle: Some(handle),
    })
}

fn register_metric_descriptions() {
    describe_counter!("cache_hits_total", "Reads that found a live value");
    describe_counter!("cache_misses_total", "Reads that found nothing");
    describe_counter!("cache_sets_total", "Writes issued to the store");
    describe_counter!("cache_deletes_total", "Deletes issued to the store");
    describe_counter!(
        "cache_store_errors_total",
        "Store calls that failed or timed out"
    );
    describe_counter!(
        "cache_decode_errors_total",
        "Payloads that could not be decompressed or deserialized"
    );
    describe_counter!(
        "cache_invalidations_total",
        "Keys removed by tag, pattern or namespace invalidation"
    );
    describe_counter!(
        "cache_swept_entries_total",
        "Metadata entries removed by the expiry sweep"
    );
    describe_counter!("cache_warmed_total", "Entries written by cache warming");
    describe_counter!("cachet_errors_total", "Errors constructed, by code");

    describe_gauge!("cache_entries", "Keys tracked in the metadata index");
    describe_gauge!("cache_memory_bytes", "Sum of stored payload sizes");
    describe_gauge!("cache_hit_rate", "Hit rate percentage");

    describe_histogram!(
        "cache_store_duration_seconds",
        "Latency of calls to the backing key/value store"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_registry_renders_empty() {
        let registry = MetricsRegistry::disabled();
        assert!(!registry.is_enabled());
        assert!(registry.render().is_empty());
    }

    #[test]
    fn test_disabled_config_skips_recorder() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };
        let registry = init_metrics(&config, "cachet-test").unwrap();
        assert!(!registry.is_enabled());
    }

    #[test]
    fn test_default_buckets_are_sorted() {
        let buckets = default_duration_buckets();
        assert!(buckets.windows(2).all(|w| w[0] < w[1]));
    }
}
