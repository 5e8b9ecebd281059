//! Maintenance commands: on-demand sweep and report.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};

use super::keys::KeyInfo;
use super::stats::{self, CacheStats};
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum MaintenanceCommands {
    /// Drop index entries whose TTL has elapsed
    Sweep,

    /// Print statistics and the hottest keys
    Report,
}

#[derive(Debug, Deserialize, Serialize)]
struct SweepReport {
    swept: usize,
    remaining: u64,
    duration_ms: u64,
    completed_at: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct MaintenanceReport {
    stats: CacheStats,
    top_keys: Vec<KeyInfo>,
    generated_at: String,
}

pub async fn execute(
    cmd: MaintenanceCommands,
    client: &ApiClient,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        MaintenanceCommands::Sweep => {
            let report: SweepReport = client.post_empty("/cache/maintenance/sweep").await?;
            match format {
                OutputFormat::Table => {
                    output::print_success(&format!(
                        "Swept {} expired key(s) in {}ms, {} remaining",
                        report.swept, report.duration_ms, report.remaining
                    ));
                    Ok(())
                }
                _ => output::print_item(&report, format),
            }
        }

        MaintenanceCommands::Report => {
            let report: MaintenanceReport = client.get("/cache/maintenance/report").await?;
            match format {
                OutputFormat::Table => {
                    output::print_header(&format!("Maintenance Report ({})", report.generated_at));
                    stats::print_stats_detail(&report.stats);
                    output::print_header("Top Keys");
                    for (rank, key) in report.top_keys.iter().enumerate() {
                        output::print_detail(
                            &format!("{}. {}", rank + 1, key.key),
                            &format!("{} accesses", key.access_count),
                        );
                    }
                    Ok(())
                }
                _ => output::print_item(&report, format),
            }
        }
    }
}
