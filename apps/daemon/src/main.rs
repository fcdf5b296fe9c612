//! # Stocklink Daemon
//!
//! Long-running poller that reconciles Mariana Tek and Webflow inventory.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stocklink Startup                                │
//! │                                                                         │
//! │  .env ──► tracing ──► config (file + env + flags) ──► validate         │
//! │                                                           │             │
//! │                               missing credential? ◄───────┤ exit 1     │
//! │                                                           ▼             │
//! │  clients + stores ──► engine ──► load snapshots ──► --once? run, exit  │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                         scheduler ──► Ctrl+C/SIGTERM ──► finish cycle  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stocklink_core::MappingSet;
use stocklink_store::{JsonMappingFile, JsonStateFile, JsonlEventLog, MappingSource};
use stocklink_sync::{
    EngineOptions, MarianaTekClient, ReconciliationEngine, SyncConfig, SyncScheduler, WebflowClient,
};

/// Two-way inventory sync between Mariana Tek and Webflow.
#[derive(Debug, Parser)]
#[command(name = "stocklink", version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, env = "STOCKLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Log decisions without calling any mutating endpoint.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal in production.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let cli = Cli::parse();

    let mut config = SyncConfig::load(cli.config.clone()).context("Failed to load configuration")?;
    if cli.dry_run {
        config.sync.dry_run = true;
    }

    info!(
        marianatek = %config.marianatek.base_url,
        collection = %config.webflow.collection_id,
        interval_secs = config.sync.interval_secs,
        throttle_secs = config.sync.throttle_secs,
        dry_run = config.sync.dry_run,
        "Configuration loaded"
    );

    let engine = build_engine(&config)?;
    let mut state = engine.load_state().context("Failed to load sync state")?;
    info!(pairs = state.snapshots().len(), "Sync state loaded");

    if cli.once {
        let report = engine.run_cycle(&mut state).await?;
        info!(
            restock = %report.restock,
            sale = %report.sale,
            duration_ms = report.duration.as_millis() as u64,
            "Cycle finished"
        );
        if !report.is_clean() {
            bail!("cycle finished with failures");
        }
        return Ok(());
    }

    let handle = SyncScheduler::new(engine, config.interval()).spawn(state);

    shutdown_signal().await;

    let status = handle.status().await;
    let state = handle.shutdown().await?;
    info!(
        cycles = status.cycles_completed,
        failed_cycles = status.cycles_failed,
        pairs = state.snapshots().len(),
        "Stocklink stopped"
    );
    Ok(())
}

/// Wires the HTTP clients and file stores into an engine.
fn build_engine(config: &SyncConfig) -> anyhow::Result<ReconciliationEngine> {
    let mappings = JsonMappingFile::new(&config.paths.mapping_file);
    match mappings.load() {
        Ok(set) => report_mapping(&set),
        // The file is re-read every cycle, so it may appear later.
        Err(e) => warn!(error = %e, "Mapping file not readable yet"),
    }

    let engine = ReconciliationEngine::builder(EngineOptions::from_config(config))
        .retry_policy(config.retry_policy())
        .side_a(Arc::new(MarianaTekClient::new(config)?))
        .side_b(Arc::new(WebflowClient::new(config)?))
        .mappings(Arc::new(mappings))
        .snapshots(Arc::new(JsonStateFile::new(&config.paths.state_file)))
        .events(Arc::new(JsonlEventLog::new(&config.paths.event_log_file)))
        .build()?;

    Ok(engine)
}

fn report_mapping(set: &MappingSet) {
    let pinned = set.entries().iter().filter(|e| e.location_id.is_some()).count();
    info!(pairs = set.len(), pinned_locations = pinned, "Mapping loaded");
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, finishing current cycle...");
}
