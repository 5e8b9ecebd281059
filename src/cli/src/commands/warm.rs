//! Bulk cache warming from a JSON or YAML file.

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::entries::EntryRequest;
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct WarmArgs {
    /// File containing a list of entries (`.json`, `.yaml` or `.yml`)
    #[arg(short, long)]
    file: PathBuf,
}

#[derive(Debug, Serialize)]
struct WarmRequest {
    entries: Vec<EntryRequest>,
}

#[derive(Debug, Deserialize, Serialize)]
struct WarmSummary {
    warmed: usize,
    failed: usize,
}

fn load_entries(path: &Path) -> Result<Vec<EntryRequest>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let entries = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    };
    Ok(entries)
}

pub async fn execute(args: WarmArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let entries = load_entries(&args.file)?;
    if entries.is_empty() {
        output::print_info("No entries to warm.");
        return Ok(());
    }

    let total = entries.len();
    let summary: WarmSummary = client
        .post("/cache/warm", &WarmRequest { entries })
        .await?;

    match format {
        OutputFormat::Table => {
            if summary.failed == 0 {
                output::print_success(&format!("Warmed {}/{} entries", summary.warmed, total));
            } else {
                output::print_warning(&format!(
                    "Warmed {}/{} entries, {} failed",
                    summary.warmed, total, summary.failed
                ));
            }
            Ok(())
        }
        _ => output::print_item(&summary, format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cachet-warm-{}-{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_yaml_entries() {
        let path = write_temp(
            "entries.yaml",
            "- key: user:1\n  value: {name: Ann}\n  ttl: 60\n  tags: [users]\n- key: flag\n  value: true\n",
        );
        let entries = load_entries(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, json!({"name": "Ann"}));
        assert_eq!(entries[0].ttl, Some(60));
        assert_eq!(entries[0].tags, vec!["users"]);
        assert_eq!(entries[1].value, json!(true));
    }

    #[test]
    fn test_load_json_entries() {
        let path = write_temp("entries.json", r#"[{"key": "k", "value": 1, "namespace": "ns"}]"#);
        let entries = load_entries(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(entries[0].namespace.as_deref(), Some("ns"));
        assert!(!entries[0].compress);
    }
}
