//! Health check command.
//!
//! Queries `/api/v1/cache/health`, or only the liveness probe with `--live`.

use anyhow::Result;
use clap::Args;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::stats::{self, CacheStats};
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct HealthArgs {
    /// Include cache statistics in the report
    #[arg(short, long)]
    detailed: bool,

    /// Only hit the liveness endpoint
    #[arg(long, conflicts_with = "detailed")]
    live: bool,
}

#[derive(Debug, Deserialize, Serialize)]
struct HealthReport {
    status: String,
    #[serde(default)]
    issues: Vec<String>,
    stats: CacheStats,
    #[serde(default)]
    probe_latency_ms: Option<u64>,
    store: String,
    checked_at: String,
}

pub async fn execute(args: HealthArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    if args.live {
        let live = client.get_raw("/health").await?;
        return match format {
            OutputFormat::Table => {
                let status = live.get("status").and_then(|v| v.as_str()).unwrap_or("unknown");
                output::print_detail("Liveness", &output::colorize_status(status).to_string());
                output::print_detail("API URL", client.base_url());
                Ok(())
            }
            _ => output::print_item(&live, format),
        };
    }

    let report: HealthReport = client
        .get_accepting("/cache/health", &[StatusCode::SERVICE_UNAVAILABLE])
        .await?;

    if format != OutputFormat::Table {
        return output::print_item(&report, format);
    }

    output::print_header("Cache Health");
    output::print_detail("Status", &output::colorize_status(&report.status).to_string());
    output::print_detail("Store", &report.store);
    output::print_detail("API URL", client.base_url());
    match report.probe_latency_ms {
        Some(ms) => output::print_detail("Probe Latency", &format!("{}ms", ms)),
        None => output::print_detail("Probe Latency", "n/a"),
    }
    output::print_detail("Checked At", &report.checked_at);

    if args.detailed {
        output::print_header("Statistics");
        stats::print_stats_detail(&report.stats);
    }

    if report.issues.is_empty() {
        output::print_success("Cache operational");
    } else {
        println!();
        for issue in &report.issues {
            if report.status == "degraded" {
                output::print_warning(issue);
            } else {
                output::print_error(issue);
            }
        }
    }

    Ok(())
}
