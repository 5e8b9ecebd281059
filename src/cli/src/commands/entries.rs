//! Writing and deleting entries.

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::keys::KeyInfo;
use crate::client::{encode_segment, ApiClient};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct SetArgs {
    /// Cache key
    key: String,

    /// Value; parsed as JSON, stored as a string when it is not valid JSON
    value: String,

    /// Time-to-live in seconds
    #[arg(short, long)]
    ttl: Option<u64>,

    /// Tag to attach (repeatable)
    #[arg(short = 'g', long = "tag")]
    tags: Vec<String>,

    /// Namespace
    #[arg(short, long)]
    namespace: Option<String>,

    /// Force compression regardless of size
    #[arg(long)]
    compress: bool,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Cache key
    key: String,

    /// Namespace
    #[arg(short, long)]
    namespace: Option<String>,
}

/// Request body for `POST /cache/entries`, also the warm file format.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryRequest {
    pub key: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub compress: bool,
}

#[derive(Debug, Deserialize, Serialize)]
struct DeleteResponse {
    key: String,
    deleted: bool,
}

/// JSON when it parses, a plain string otherwise.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn set(args: SetArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let request = EntryRequest {
        value: parse_value(&args.value),
        key: args.key,
        ttl: args.ttl,
        tags: args.tags,
        namespace: args.namespace,
        compress: args.compress,
    };

    let info: KeyInfo = client
        .post("/cache/entries", &request)
        .await
        .with_context(|| format!("Failed to write {}", request.key))?;

    match format {
        OutputFormat::Table => {
            output::print_success(&format!(
                "{} written ({}, ttl {}s)",
                info.key,
                output::human_bytes(info.size_bytes),
                info.ttl_seconds
            ));
            Ok(())
        }
        _ => output::print_item(&info, format),
    }
}

pub async fn delete(args: DeleteArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let mut path = format!("/cache/keys/{}", encode_segment(&args.key));
    if let Some(ns) = &args.namespace {
        path.push_str(&format!("?namespace={}", encode_segment(ns)));
    }
    let resp: DeleteResponse = client.delete(&path).await?;

    match format {
        OutputFormat::Table => {
            if resp.deleted {
                output::print_success(&format!("{} deleted", resp.key));
            } else {
                output::print_info(&format!("{} was not cached", resp.key));
            }
            Ok(())
        }
        _ => output::print_item(&resp, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value_prefers_json() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_value("plain text"), json!("plain text"));
    }
}
