//! ddash-tracker - tracking notes service for the declaration dashboard
//!
//! Stores operator notes per MRN in a flat JSON file and serves the shared
//! reconciliation computations over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use ddash_common::config::{CliOverrides, ConfigResolver};
use ddash_tracker::{build_router, AppState, TrackingStore};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{prelude::*, reload, EnvFilter};

/// Command-line arguments. Each overrides the matching environment variable
/// and config file key.
#[derive(Debug, Parser)]
#[command(name = "ddash-tracker", version, about = "Tracking notes service")]
struct Args {
    /// Listen port [env: PORT]
    #[arg(long)]
    port: Option<u16>,

    /// Bind address [env: DDASH_BIND]
    #[arg(long)]
    bind: Option<String>,

    /// Tracking store file [env: DDASH_DATA_FILE]
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// TOML config file (default: <config dir>/ddash/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        CliOverrides {
            port: args.port,
            bind: args.bind,
            data_file: args.data_file,
            config_file: args.config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise start at info and switch to the configured
    // level once the config file has been read.
    let rust_log_set = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    let initial_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, filter_handle) = reload::Layer::new(initial_filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting ddash-tracker v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli: CliOverrides = args.into();
    let config = ConfigResolver::new()
        .resolve(&cli)
        .context("Failed to resolve configuration")?;

    if !rust_log_set {
        let configured = EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("Invalid log level {:?}", config.log_level))?;
        filter_handle
            .reload(configured)
            .context("Failed to apply log level")?;
    }

    let store = TrackingStore::new(config.data_file.clone());
    // Fail fast on a corrupt store rather than on the first request
    let existing = store
        .load()
        .await
        .with_context(|| format!("Failed to read {}", config.data_file.display()))?;
    info!(
        "Tracking store: {} ({} MRN records)",
        config.data_file.display(),
        existing.records.len()
    );

    let app = build_router(AppState::new(store));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("ddash-tracker listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ddash-tracker stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
