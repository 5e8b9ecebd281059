//! Background maintenance: the periodic expiry sweep and the periodic
//! statistics report.
//!
//! Both tasks only read or prune the engine's in-process index. The store
//! expires values on its own.

use super::engine::CacheEngine;
use super::index::EntryMetadata;
use super::stats::CacheStats;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// Maintenance schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Run the background tasks at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,

    #[serde(default = "default_report_interval", with = "humantime_serde")]
    pub report_interval: Duration,

    /// Keys listed in each report
    #[serde(default = "default_top_keys")]
    pub top_keys: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_report_interval() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_top_keys() -> usize {
    5
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sweep_interval: default_sweep_interval(),
            report_interval: default_report_interval(),
            top_keys: default_top_keys(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Reports
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceState {
    #[default]
    Idle,
    Sweeping,
}

/// Result of one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    /// Metadata entries removed
    pub swept: usize,

    /// Entries still tracked afterwards
    pub remaining: u64,

    pub duration_ms: u64,

    pub completed_at: DateTime<Utc>,
}

/// Periodic snapshot of cache activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub stats: CacheStats,
    pub top_keys: Vec<EntryMetadata>,
    pub generated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tasks
// ═══════════════════════════════════════════════════════════════════════════════

/// The work each tick performs, shareable with spawned loops.
#[derive(Clone)]
struct MaintenanceTasks {
    engine: Arc<CacheEngine>,
    state: Arc<RwLock<MaintenanceState>>,
    top_keys: usize,
}

impl MaintenanceTasks {
    fn sweep(&self) -> SweepReport {
        let started = Instant::now();
        *self.state.write() = MaintenanceState::Sweeping;
        let swept = self.engine.sweep_expired();
        *self.state.write() = MaintenanceState::Idle;

        let report = SweepReport {
            swept,
            remaining: self.engine.get_stats().key_count,
            duration_ms: started.elapsed().as_millis() as u64,
            completed_at: Utc::now(),
        };
        info!(
            swept = report.swept,
            remaining = report.remaining,
            duration_ms = report.duration_ms,
            "Maintenance sweep finished"
        );
        report
    }

    fn report(&self) -> MaintenanceReport {
        let report = MaintenanceReport {
            stats: self.engine.get_stats(),
            top_keys: self.engine.get_top_keys(self.top_keys),
            generated_at: Utc::now(),
        };

        let top: Vec<(&str, u64)> = report
            .top_keys
            .iter()
            .map(|entry| (entry.key.as_str(), entry.access_count))
            .collect();
        info!(
            hits = report.stats.hits,
            misses = report.stats.misses,
            sets = report.stats.sets,
            deletes = report.stats.deletes,
            hit_rate = report.stats.hit_rate,
            key_count = report.stats.key_count,
            memory_usage = report.stats.memory_usage,
            top_keys = ?top,
            "Cache report"
        );
        if !self.engine.index_is_consistent() {
            warn!("Tag index and key metadata disagree");
        }
        report
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scheduler
// ═══════════════════════════════════════════════════════════════════════════════

/// Runs the sweep and report on fixed intervals until shut down.
pub struct MaintenanceScheduler {
    tasks: MaintenanceTasks,
    config: MaintenanceConfig,
    shutdown: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl MaintenanceScheduler {
    pub fn new(engine: Arc<CacheEngine>, config: MaintenanceConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            tasks: MaintenanceTasks {
                engine,
                state: Arc::new(RwLock::new(MaintenanceState::Idle)),
                top_keys: config.top_keys,
            },
            config,
            shutdown,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    pub fn state(&self) -> MaintenanceState {
        *self.tasks.state.read()
    }

    /// Sweep now, outside the schedule.
    pub fn run_sweep(&self) -> SweepReport {
        self.tasks.sweep()
    }

    /// Report now, outside the schedule.
    pub fn run_report(&self) -> MaintenanceReport {
        self.tasks.report()
    }

    /// Spawn the interval loops. Must be called inside a tokio runtime.
    pub fn start(&self) {
        if !self.config.enabled {
            info!("Cache maintenance disabled");
            return;
        }

        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            warn!("Cache maintenance already running");
            return;
        }

        let sweep_tasks = self.tasks.clone();
        if let Some(handle) = self.spawn_loop("sweep", self.config.sweep_interval, move || {
            sweep_tasks.sweep();
        }) {
            handles.push(handle);
        }

        let report_tasks = self.tasks.clone();
        if let Some(handle) = self.spawn_loop("report", self.config.report_interval, move || {
            report_tasks.report();
        }) {
            handles.push(handle);
        }
    }

    fn spawn_loop<F>(&self, task: &'static str, period: Duration, job: F) -> Option<JoinHandle<()>>
    where
        F: Fn() + Send + 'static,
    {
        if period.is_zero() {
            warn!(task, "Maintenance interval is zero, task not started");
            return None;
        }

        let mut shutdown_rx = self.shutdown.subscribe();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            info!(task, period = ?period, "Maintenance task started");

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => job(),
                }
            }

            info!(task, "Maintenance task stopped");
        }))
    }

    /// Whether the interval loops are running.
    pub fn is_running(&self) -> bool {
        self.handles.lock().iter().any(|handle| !handle.is_finished())
    }

    /// Signal the loops to stop and wait for them.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Maintenance task ended abnormally");
            }
        }
    }
}
