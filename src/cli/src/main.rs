//! Cachet CLI - operate a running Cachet cache server over its admin API.
//!
//! Provides statistics, health, key introspection, writes, invalidation,
//! warming, maintenance, and local configuration commands.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config, entries, health, invalidate, keys, maintenance, stats, warm};
use output::OutputFormat;

/// Cachet - tag-indexed cache engine CLI
#[derive(Parser)]
#[command(
    name = "cachet",
    author = "Aezi <aezi.zhu@icloud.com>",
    version = "0.1.0",
    about = "Cachet - tag-indexed cache engine",
    long_about = "CLI tool for inspecting, writing to, and invalidating a Cachet cache server.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format (defaults to the `output` config value, then table)
    #[arg(short, long, global = true)]
    output: Option<OutputFormat>,

    /// API server URL
    #[arg(long, global = true, env = "CACHET_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show hit/miss counters, key count and memory usage
    Stats,

    /// Check cache health
    Health(health::HealthArgs),

    /// Key introspection
    #[command(subcommand)]
    Keys(keys::KeysCommands),

    /// Write a value
    Set(entries::SetArgs),

    /// Delete a key
    Delete(entries::DeleteArgs),

    /// Invalidate by tag, pattern or namespace
    #[command(subcommand)]
    Invalidate(invalidate::InvalidateCommands),

    /// Pre-populate the cache from a file
    Warm(warm::WarmArgs),

    /// Sweep expired metadata or print a maintenance report
    #[command(subcommand)]
    Maintenance(maintenance::MaintenanceCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let settings = config::load_settings();
    let api_url = cli
        .api_url
        .clone()
        .or(settings.api_url)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = client::ApiClient::new(&api_url)?;
    let format = cli.output.or(settings.output).unwrap_or_default();

    let result = match cli.command {
        Commands::Stats => stats::execute(&client, format).await,
        Commands::Health(args) => health::execute(args, &client, format).await,
        Commands::Keys(cmd) => keys::execute(cmd, &client, format).await,
        Commands::Set(args) => entries::set(args, &client, format).await,
        Commands::Delete(args) => entries::delete(args, &client, format).await,
        Commands::Invalidate(cmd) => invalidate::execute(cmd, &client, format).await,
        Commands::Warm(args) => warm::execute(args, &client, format).await,
        Commands::Maintenance(cmd) => maintenance::execute(cmd, &client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format),
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
