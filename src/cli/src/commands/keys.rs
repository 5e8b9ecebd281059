//! Key introspection commands.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::{encode_segment, ApiClient};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum KeysCommands {
    /// Most frequently accessed keys
    Top {
        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Metadata for one key
    Info {
        /// Cache key, without namespace
        key: String,

        /// Namespace the key was written under
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Keys carrying a tag
    Tag {
        /// Tag name
        tag: String,
    },
}

#[derive(Debug, Deserialize, Serialize)]
pub struct KeyInfo {
    pub key: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub size_bytes: u64,
    pub ttl_seconds: u64,
    pub created_at: String,
    pub last_accessed: String,
    pub access_count: u64,
}

#[derive(Debug, Serialize, Tabled)]
struct KeyRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Accesses")]
    access_count: u64,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "TTL")]
    ttl: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl From<KeyInfo> for KeyRow {
    fn from(info: KeyInfo) -> Self {
        Self {
            key: info.key,
            access_count: info.access_count,
            size: output::human_bytes(info.size_bytes),
            ttl: format!("{}s", info.ttl_seconds),
            tags: info.tags.join(", "),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct TagKeys {
    tag: String,
    keys: Vec<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct TagKeyRow {
    #[tabled(rename = "Key")]
    key: String,
}

pub async fn execute(cmd: KeysCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        KeysCommands::Top { limit } => {
            let keys: Vec<KeyInfo> = client
                .get(&format!("/cache/top-keys?limit={}", limit))
                .await?;
            match format {
                OutputFormat::Table => {
                    let rows: Vec<KeyRow> = keys.into_iter().map(KeyRow::from).collect();
                    output::print_list(&rows, format)
                }
                _ => output::print_item(&keys, format),
            }
        }

        KeysCommands::Info { key, namespace } => {
            let mut path = format!("/cache/keys/{}", encode_segment(&key));
            if let Some(ns) = &namespace {
                path.push_str(&format!("?namespace={}", encode_segment(ns)));
            }
            let info: KeyInfo = client.get(&path).await?;

            match format {
                OutputFormat::Table => {
                    output::print_header(&format!("Key: {}", info.key));
                    output::print_detail("Tags", &info.tags.join(", "));
                    output::print_detail("Size", &output::human_bytes(info.size_bytes));
                    output::print_detail("TTL", &format!("{}s", info.ttl_seconds));
                    output::print_detail("Accesses", &info.access_count.to_string());
                    output::print_detail("Created", &info.created_at);
                    output::print_detail("Last Accessed", &info.last_accessed);
                    Ok(())
                }
                _ => output::print_item(&info, format),
            }
        }

        KeysCommands::Tag { tag } => {
            let resp: TagKeys = client
                .get(&format!("/cache/tags/{}/keys", encode_segment(&tag)))
                .await?;
            match format {
                OutputFormat::Table => {
                    let rows: Vec<TagKeyRow> =
                        resp.keys.into_iter().map(|key| TagKeyRow { key }).collect();
                    output::print_list(&rows, format)
                }
                _ => output::print_item(&resp, format),
            }
        }
    }
}
