//! Invalidation commands.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum InvalidateCommands {
    /// Delete every key carrying a tag
    Tag { tag: String },

    /// Delete every key carrying any of the tags
    Tags {
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Delete keys matching a `*` wildcard pattern
    Pattern { pattern: String },

    /// Delete every key in a namespace
    Namespace { namespace: String },

    /// Show recent invalidations
    History {
        /// Maximum number of records
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Debug, Deserialize, Serialize)]
struct InvalidationResponse {
    invalidated: usize,
}

#[derive(Debug, Deserialize, Serialize)]
struct InvalidationRecord {
    event: serde_json::Value,
    count: usize,
    timestamp: String,
    duration_ms: u64,
}

#[derive(Debug, Serialize, Tabled)]
struct HistoryRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "At")]
    timestamp: String,
}

impl From<InvalidationRecord> for HistoryRow {
    fn from(record: InvalidationRecord) -> Self {
        let kind = record.event["type"].as_str().unwrap_or("?").to_string();
        let target = match &record.event {
            e if e.get("key").is_some() => e["key"].as_str().unwrap_or_default().to_string(),
            e if e.get("pattern").is_some() => e["pattern"].as_str().unwrap_or_default().to_string(),
            e if e.get("namespace").is_some() => {
                e["namespace"].as_str().unwrap_or_default().to_string()
            }
            e => e["tags"]
                .as_array()
                .map(|tags| {
                    tags.iter()
                        .filter_map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default(),
        };
        Self {
            kind,
            target,
            count: record.count,
            duration: format!("{}ms", record.duration_ms),
            timestamp: record.timestamp,
        }
    }
}

pub async fn execute(
    cmd: InvalidateCommands,
    client: &ApiClient,
    format: OutputFormat,
) -> Result<()> {
    let (label, resp): (String, InvalidationResponse) = match cmd {
        InvalidateCommands::Tag { tag } => {
            let resp = client
                .post("/cache/invalidate/tag", &json!({ "tag": tag }))
                .await?;
            (format!("tag {}", tag), resp)
        }
        InvalidateCommands::Tags { tags } => {
            let resp = client
                .post("/cache/invalidate/tags", &json!({ "tags": tags }))
                .await?;
            (format!("tags {}", tags.join(", ")), resp)
        }
        InvalidateCommands::Pattern { pattern } => {
            let resp = client
                .post("/cache/invalidate/pattern", &json!({ "pattern": pattern }))
                .await?;
            (format!("pattern {}", pattern), resp)
        }
        InvalidateCommands::Namespace { namespace } => {
            let resp = client
                .post("/cache/invalidate/namespace", &json!({ "namespace": namespace }))
                .await?;
            (format!("namespace {}", namespace), resp)
        }
        InvalidateCommands::History { limit } => {
            let records: Vec<InvalidationRecord> = client
                .get(&format!("/cache/invalidations?limit={}", limit))
                .await?;
            return match format {
                OutputFormat::Table => {
                    let rows: Vec<HistoryRow> =
                        records.into_iter().map(HistoryRow::from).collect();
                    output::print_list(&rows, format)
                }
                _ => output::print_item(&records, format),
            };
        }
    };

    match format {
        OutputFormat::Table => {
            output::print_success(&format!(
                "Invalidated {} key(s) by {}",
                resp.invalidated, label
            ));
            Ok(())
        }
        _ => output::print_item(&resp, format),
    }
}
