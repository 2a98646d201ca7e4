use std::sync::Arc;
use tracing::info;

use PositionRecon::config::AppConfig;
use PositionRecon::observability::metrics;
use PositionRecon::recon::engine::PositionReconstructionEngine;
use PositionRecon::recon::recovery::UnmappedRecoveryScheduler;
use PositionRecon::store::memory::in_memory_stack;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    metrics::register_metrics();

    let env = std::env::var("RECON_ENV").unwrap_or_else(|_| "dev".to_string());
    let config = AppConfig::load(&env)?;
    info!(
        recovery_interval_secs = config.recovery.interval_secs,
        lock_idle_ttl_secs = config.locks.idle_ttl_secs,
        "starting position reconstruction service"
    );

    // Demo wiring: a real deployment injects the relational store, the event
    // transport and the journal service here.
    let (store, publisher, journal) = in_memory_stack();
    let engine = Arc::new(PositionReconstructionEngine::new(
        store.clone(),
        publisher,
        journal,
    ));

    let scheduler = UnmappedRecoveryScheduler::new(
        engine,
        store,
        config.recovery_interval(),
        config.lock_idle_ttl(),
    );
    scheduler.run().await;
    Ok(())
}
