//! Cache statistics command.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Debug, Deserialize, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub hit_rate: f64,
    pub key_count: u64,
    pub memory_usage: u64,
}

pub fn print_stats_detail(stats: &CacheStats) {
    output::print_detail("Keys", &stats.key_count.to_string());
    output::print_detail("Memory", &output::human_bytes(stats.memory_usage));
    output::print_detail("Hits", &stats.hits.to_string());
    output::print_detail("Misses", &stats.misses.to_string());
    output::print_detail("Hit Rate", &format!("{:.2}%", stats.hit_rate));
    output::print_detail("Sets", &stats.sets.to_string());
    output::print_detail("Deletes", &stats.deletes.to_string());
}

pub async fn execute(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats: CacheStats = client.get("/cache/stats").await?;

    match format {
        OutputFormat::Table => {
            output::print_header("Cache Statistics");
            print_stats_detail(&stats);
            Ok(())
        }
        _ => output::print_item(&stats, format),
    }
}
