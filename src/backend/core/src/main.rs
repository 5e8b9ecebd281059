//! Cachet Server - admin HTTP surface and maintenance scheduler around the
//! cache engine.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use cachet_core::{
    api::{self, AppState},
    cache::{CacheEngine, InMemoryStore, KeyValueStore, MaintenanceScheduler, RedisStore},
    config::{Config, StoreBackend},
    telemetry,
};

#[derive(Parser, Debug)]
#[command(name = "cachet-server", version, about = "Cachet cache engine server")]
struct Args {
    /// Configuration file; environment variables override it
    #[arg(short, long, env = "CACHET_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: Could not load config: {}. Using defaults.", e);
            Config::default()
        }),
    };

    let metrics = telemetry::init_telemetry(&config.telemetry)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.telemetry.environment,
        "Starting Cachet Server"
    );

    // Connect to the store
    let mut purger = None;
    let store: Arc<dyn KeyValueStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory store");
            let store = Arc::new(InMemoryStore::new(config.store.in_memory()));
            purger = store.spawn_purger();
            store
        }
        StoreBackend::Redis => {
            let store = RedisStore::connect(config.store.redis())
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!(url = %config.store.redis_url, "Connected to Redis");
            Arc::new(store)
        }
    };

    let engine = Arc::new(CacheEngine::new(store, config.cache_config()));

    let maintenance = Arc::new(MaintenanceScheduler::new(
        engine.clone(),
        config.maintenance.clone(),
    ));
    maintenance.start();

    let app = api::build_router(AppState::new(engine, maintenance.clone(), metrics));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    maintenance.shutdown().await;
    if let Some(purger) = purger {
        purger.stop().await;
    }
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
