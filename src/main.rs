// SPDX-License-Identifier: MIT

//! Hexturf leaderboard aggregation job host.
//!
//! Runs the refresh scheduler against the configured ledger. Capture and
//! rollback are invoked by the API layer through the library; this binary
//! only keeps the leaderboard cache warm.

use std::sync::Arc;
use std::time::Duration;

use hexturf::{
    config::{Config, GLOBAL_LEADERBOARD},
    db::{FirestoreLedger, Ledger, MemoryLedger},
    services::RefreshScheduler,
    TerritoryEngine,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        resolution = u8::from(config.hex_resolution),
        refresh_minutes = config.leaderboard_refresh_minutes,
        "Starting hexturf leaderboard job"
    );

    let ledger: Arc<dyn Ledger> = if config.gcp_project_id.is_empty() {
        tracing::warn!("GCP_PROJECT_ID not set, using in-memory ledger");
        Arc::new(MemoryLedger::new())
    } else {
        Arc::new(
            FirestoreLedger::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        )
    };

    let engine = TerritoryEngine::new(config.clone(), ledger);

    let (handle, scheduler) =
        RefreshScheduler::new(engine.leaderboard.clone(), GLOBAL_LEADERBOARD);
    let period = Duration::from_secs(config.leaderboard_refresh_minutes * 60);
    let timer = RefreshScheduler::spawn_interval(handle, period);
    let worker = tokio::spawn(scheduler.run());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    timer.abort();
    worker.abort();
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hexturf=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
